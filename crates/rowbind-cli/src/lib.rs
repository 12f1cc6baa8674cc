mod cli;
mod commands;

pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Tables(args) => commands::tables(args),
        cli::Command::Describe(args) => commands::describe(args),
        cli::Command::Query(args) => commands::query(args),
        cli::Command::Get(args) => commands::get(args),
    }
}
