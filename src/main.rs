fn main() -> Result<(), Box<dyn std::error::Error>> {
    anim::cli::main()
}
