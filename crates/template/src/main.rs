use template::runtime::{boot, pipe};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let (registry, config) = boot::boot()?;
    pipe::serve(registry, config)
}
