fn main() -> anyhow::Result<()> {
    oxrouter::cli::run_cli()
}
