use crate::{config::RoomConfig, connection::ConnectQuery};
use tracing::*;
use warp::Filter;

mod actor;
mod config;
mod connection;
mod registry;
mod room;

#[tokio::main]
async fn main() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = RoomConfig::from_env();
    let listen_addr = config.listen_addr;
    let registry = registry::spawn(config);

    // ws://host:port/room/<name>?name=...&avatar=...&reconnectToken=...
    let room_route = warp::path!("room" / String)
        .and(warp::ws())
        .and(warp::query::<ConnectQuery>())
        .and(warp::any().map(move || registry.clone()))
        .map(|room_name: String, ws: warp::ws::Ws, query: ConnectQuery, registry| {
            ws.on_upgrade(move |socket| connection::run_connection(room_name, query, socket, registry))
        });

    let index = warp::path::end().map(|| warp::reply::html(INDEX_HTML));

    let routes = index.or(room_route);

    info!(%listen_addr, "starting mahjong server");
    warp::serve(routes).run(listen_addr).await;
}

static INDEX_HTML: &str = r#"
<!DOCTYPE html>
<html>
    <head>
        <title>Mahjong</title>
    </head>
    <body>
        <p>Connect a client to <code>ws://&lt;host&gt;/room/&lt;name&gt;?name=...&amp;avatar=...</code>.</p>
    </body>
</html>
"#;
