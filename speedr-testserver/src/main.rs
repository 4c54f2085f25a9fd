use std::net::SocketAddr;

use anyhow::Context as _;
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut options = speedr_testserver::TestServerOptions::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args
                    .next()
                    .context("--bind requires an address, e.g. 127.0.0.1:0")?;
                bind_addr = addr.parse()?;
            }
            "--fail-every" => {
                let n = args.next().context("--fail-every requires a number")?;
                options.fail_every = Some(n.parse()?);
            }
            "--omit-server-timing" => options.omit_server_timing = true,
            "-h" | "--help" => {
                eprintln!(
                    "speedr-testserver\n\nUSAGE:\n  \
                     speedr-testserver [--bind 127.0.0.1:0] [--fail-every N] \
                     [--omit-server-timing]\n\n\
                     OUTPUT:\n  Prints HTTP_URL=<url> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let stats = speedr_testserver::TestServerStats::default();
    let app = speedr_testserver::router(stats, options);

    println!("HTTP_URL=http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
