fn main() -> std::process::ExitCode {
    kiro_switch::run()
}
