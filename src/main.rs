use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = meross_bridge::cli::Cli::parse();
    meross_bridge::init_tracing(cli.debug);
    let exit_code = meross_bridge::run(cli).await;
    std::process::exit(exit_code);
}
