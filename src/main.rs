use std::ffi::OsString;

use dcos::cli::{builtin_groups, compose};
use dcos::logging;
use dcos::Context;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    let builtins = builtin_groups();

    // Logging comes first so plugin discovery honors -v
    let names: Vec<&str> = builtins.iter().map(|group| group.name()).collect();
    logging::init(logging::count_verbosity(&args, &names));

    let ctx = match Context::from_env() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let tree = compose(&ctx, builtins);
    let code = tree.run(&ctx, args).await;
    std::process::exit(code);
}
