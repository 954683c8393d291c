use crate::diagnose::{run_diagnose, run_questionnaire, DiagnoseArgs, QuestionnaireArgs};
use crate::server;
use cf_diagnosis::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "cf-diagnosis",
    about = "Certainty Factor diagnosis of gastric complaints from reported symptoms",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the symptom questions and the answer scale
    Questionnaire(QuestionnaireArgs),
    /// Score a complete answer sheet and print the ranked diagnosis
    Diagnose(DiagnoseArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Questionnaire(args) => run_questionnaire(args),
        Command::Diagnose(args) => run_diagnose(args),
    }
}
