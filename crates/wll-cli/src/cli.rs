use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wll",
    about = "WorldLine Ledger: staging index with move/delete tracking",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new WLL repository
    Init(InitArgs),
    /// Stage files
    Add(AddArgs),
    /// List staged entries
    LsFiles(LsFilesArgs),
    /// Delete files or folders, staging the removal
    Rm(RmArgs),
    /// Move or rename a file or folder, staging the rename
    Mv(MvArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<String>,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct LsFilesArgs {
    /// Show mode, object id and merge stage
    #[arg(short, long)]
    pub stage: bool,
}

#[derive(Args)]
pub struct RmArgs {
    #[arg(required = true)]
    pub paths: Vec<String>,
    /// Skip the synchronization check
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct MvArgs {
    pub src: String,
    pub dst: String,
    /// Skip the synchronization check
    #[arg(short, long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mv_with_force() {
        let cli = Cli::try_parse_from(["wll", "mv", "-f", "a.txt", "b.txt"]).unwrap();
        match cli.command {
            Command::Mv(args) => {
                assert!(args.force);
                assert_eq!(args.src, "a.txt");
                assert_eq!(args.dst, "b.txt");
            }
            _ => panic!("expected mv"),
        }
    }

    #[test]
    fn parses_ls_files_json() {
        let cli = Cli::try_parse_from(["wll", "ls-files", "--stage", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::LsFiles(LsFilesArgs { stage: true })));
    }

    #[test]
    fn rm_requires_a_path() {
        assert!(Cli::try_parse_from(["wll", "rm"]).is_err());
    }
}
