//! # Command Line Interface
//! 
//! The clap command tree is built in `cli.rs`.
//! Subcommands are run by the `commands` module of the library.

mod cli;

use env_logger;
use cbmkit::commands;

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let main_cmd = cli::build_cli();
    let matches = main_cmd.clone().get_matches();

    if let Some(cmd) = matches.subcommand_matches("completions") {
        return commands::completions::generate(main_cmd,cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("mkdsk") {
        return commands::mkdsk::mkdsk(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("catalog") {
        return commands::stat::catalog(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("stat") {
        return commands::stat::stat(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("geometry") {
        return commands::stat::geometry(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("get") {
        return commands::get::get(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("put") {
        return commands::put::put(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("delete") {
        return commands::modify::delete(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("rename") {
        return commands::modify::rename(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("copy") {
        return commands::modify::copy(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("validate") {
        return commands::modify::validate(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("cmd") {
        return commands::modify::cmd(cmd);
    }

    eprintln!("No subcommand was found, try `cbmkit --help`");
    return Err(Box::new(commands::CommandError::InvalidCommand));
}
