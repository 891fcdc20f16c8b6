fn main() {
    pbx_cli::Cli::run();
}
