use clap::Parser;
use log::{debug, info, warn};
use shared::message::{SpawnPoint, TileBlockRequest, Vitals};
use shared::{Color, FrameDecoder, Message, Player, PROTOCOL_VERSION};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:7777")]
    server: String,
    /// Character name
    #[clap(short, long, default_value = "Tester")]
    name: String,
    /// Password to answer with if the server asks for one
    #[clap(short = 'P', long, default_value = "")]
    password: String,
    /// Version token to present
    #[clap(long, default_value = PROTOCOL_VERSION)]
    version: String,
    /// Seconds to stay connected after spawning
    #[clap(short, long, default_value = "5")]
    linger: u64,
}

async fn send(writer: &mut OwnedWriteHalf, message: &Message) -> std::io::Result<()> {
    debug!("-> {:?}", message.kind());
    writer.write_all(&message.to_frame()).await
}

/// Connects, walks through the handshake and spawns, logging every message.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let stream = TcpStream::connect(&args.server).await?;
    info!("Connected to {} from {}", args.server, stream.local_addr()?);
    let (mut reader, mut writer) = stream.into_split();

    send(
        &mut writer,
        &Message::ConnectionRequest {
            version: Some(args.version.clone()),
        },
    )
    .await?;

    let mut decoder = FrameDecoder::new();
    let mut buffer = vec![0u8; 8192];
    let mut client_number = 0;
    let mut rows = 0usize;
    let linger = tokio::time::sleep(Duration::from_secs(365 * 24 * 60 * 60));
    tokio::pin!(linger);

    loop {
        let n = tokio::select! {
            result = reader.read(&mut buffer) => result?,
            _ = &mut linger => {
                info!("Done, disconnecting");
                break;
            }
        };
        if n == 0 {
            info!("Server closed the connection");
            break;
        }

        for frame in decoder.decode(&buffer[..n])? {
            let message = match Message::from_frame(&frame) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Undecodable message: {}", e);
                    continue;
                }
            };

            match message {
                Message::PasswordRequest => {
                    info!("Server wants a password");
                    send(
                        &mut writer,
                        &Message::PasswordResponse {
                            password: args.password.clone(),
                        },
                    )
                    .await?;
                }
                Message::PlayerDataRequest { client_number: number } => {
                    client_number = number;
                    info!("Assigned client number {}", number);
                    let mut player = Player::new(args.name.clone());
                    player.appearance.hair_color = Color::new(215, 90, 55);
                    send(&mut writer, &Message::PlayerInfo { client_number, player }).await?;
                    send(
                        &mut writer,
                        &Message::PlayerHp(Vitals {
                            client_number,
                            current: 100,
                            max: 100,
                        }),
                    )
                    .await?;
                    send(
                        &mut writer,
                        &Message::PlayerMana(Vitals {
                            client_number,
                            current: 20,
                            max: 20,
                        }),
                    )
                    .await?;
                    send(&mut writer, &Message::WorldDataRequest).await?;
                }
                Message::WorldData(world) => {
                    info!(
                        "World '{}' is {}x{}, spawn at ({}, {})",
                        world.name, world.width, world.height, world.spawn_x, world.spawn_y
                    );
                    send(
                        &mut writer,
                        &Message::TileBlockRequest(TileBlockRequest {
                            x: world.spawn_x as i32,
                            y: world.spawn_y as i32,
                        }),
                    )
                    .await?;
                }
                Message::TileLoading { hint, text } => info!("{} (hint {})", text, hint),
                Message::TileSection(_) => rows += 1,
                Message::TileConfirm(confirm) => info!(
                    "Sections ({}, {})..({}, {}) loaded, {} rows so far",
                    confirm.start_x, confirm.start_y, confirm.end_x, confirm.end_y, rows
                ),
                Message::SpawnRequest => {
                    send(
                        &mut writer,
                        &Message::Spawn(SpawnPoint {
                            client_number,
                            x: -1,
                            y: -1,
                        }),
                    )
                    .await?;
                    send(
                        &mut writer,
                        &Message::Chat {
                            client_number,
                            color: Color::new(255, 255, 255),
                            text: format!("Hello from {}", args.name),
                        },
                    )
                    .await?;
                    info!("Spawned, staying {}s", args.linger);
                    linger
                        .as_mut()
                        .reset(tokio::time::Instant::now() + Duration::from_secs(args.linger));
                }
                Message::Chat { client_number, text, .. } => {
                    info!("[chat {}] {}", client_number, text)
                }
                Message::Disconnect { reason } => info!("Disconnected: {}", reason),
                other => info!("<- {:?}", other),
            }
        }
    }

    writer.shutdown().await?;
    Ok(())
}
