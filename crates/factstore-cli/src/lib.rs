//! Command line front end for `factstore`.

pub mod cli;
pub mod commands;

use cli::{Command, parse_args, print_help};

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    match parse_args(&args)? {
        Command::Help(topic) => {
            print_help(topic);
            Ok(())
        }
        Command::Migrate(global) => commands::run_migrate(global).await,
        Command::Token(args) => commands::run_token(args).await,
        Command::Entity(args) => commands::run_entity(args).await,
    }
}
