use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("firmata {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: firmata");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("FIRMATA_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "git_hash: {}",
        option_env!("FIRMATA_GIT_HASH").unwrap_or("unknown")
    );
    println!(
        "protocol: {}.{}",
        firmata_codec::PROTOCOL_MAJOR_VERSION,
        firmata_codec::PROTOCOL_MINOR_VERSION
    );
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
