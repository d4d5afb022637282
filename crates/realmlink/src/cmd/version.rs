use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("realmlink {}", env!("CARGO_PKG_VERSION"));
    if args.extended {
        println!(
            "target: {}",
            option_env!("REALMLINK_BUILD_TARGET").unwrap_or("unknown")
        );
        println!(
            "profile: {}",
            option_env!("REALMLINK_BUILD_PROFILE").unwrap_or("unknown")
        );
        println!(
            "types: {}",
            realmlink_codec::standard_registry().names().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(SUCCESS)
}
