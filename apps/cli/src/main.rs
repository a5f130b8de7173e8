fn main() -> anyhow::Result<()> {
    mdanki_cli::run()
}
