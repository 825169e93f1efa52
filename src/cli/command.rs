use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(
        about = "Insert the starter quotes",
        long_about = "Insert the three starter quotes into the store. Does nothing when the store already holds quotes."
    )]
    Seed,
    #[command(
        about = "Print all quotes as JSON",
        long_about = "Print every stored quote as a JSON array on stdout, in id order."
    )]
    Export {
        #[arg(long, default_value_t = false, help = "Pretty-print the JSON output")]
        pretty: bool,
    },
}
