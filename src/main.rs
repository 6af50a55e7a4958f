use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    folder: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    vfeed::app::run(vfeed::app::StartupOptions {
        folder: args.folder,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument {other}"),
            other => {
                if out.folder.is_some() {
                    anyhow::bail!("only one folder can be given");
                }
                if other.trim().is_empty() {
                    anyhow::bail!("folder cannot be empty");
                }
                out.folder = Some(PathBuf::from(other));
            }
        }
    }
    Ok(out)
}

fn print_help() {
    println!("vfeed [FOLDER]");
    println!("  FOLDER        Folder of videos to play (defaults to the last one opened)");
    println!("  -h, --help    Show this help");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_is_optional() {
        let args = parse_args(Vec::new()).expect("parse");
        assert_eq!(args.folder, None);

        let args = parse_args(vec![String::from("clips")]).expect("parse");
        assert_eq!(args.folder, Some(PathBuf::from("clips")));
    }

    #[test]
    fn rejects_unknown_flags_and_extra_folders() {
        assert!(parse_args(vec![String::from("--host")]).is_err());
        assert!(parse_args(vec![String::from("a"), String::from("b")]).is_err());
    }
}
