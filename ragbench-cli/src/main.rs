fn main() -> anyhow::Result<()> {
    ragbench_cli::run()
}
