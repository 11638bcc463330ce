use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use perch_core::types::{
    CreateCodeCommentInput, CreateUserInput, DismissReviewInput, PullId, RegisterPullInput, RepoId,
    ReviewFilter, ReviewId, ReviewKind, SubmitReviewInput, UserId,
};
use perch_core::{Config, Perch, PerchError, RequestContext};
use perch_db::DbStore;
use perch_events::bus::EventBus;
use perch_events::types::EventSource;
use perch_git::GixContext;
use std::path::Path;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "perch", about = "Pull request review workflow engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Pull(PullCommand),
    #[command(subcommand)]
    Comment(CommentCommand),
    #[command(subcommand)]
    Review(ReviewCommand),
    /// Print the event log.
    Events {
        #[arg(long)]
        after: Option<i64>,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    Create {
        #[arg(long)]
        handle: String,
        #[arg(long)]
        name: String,
    },
    Show {
        handle: String,
    },
}

#[derive(Subcommand)]
enum PullCommand {
    Register {
        #[arg(long)]
        repo: String,
        #[arg(long)]
        index: i64,
        #[arg(long)]
        author: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        base: String,
        #[arg(long)]
        head: String,
    },
    List,
    Show {
        id: String,
    },
}

#[derive(Subcommand)]
enum CommentCommand {
    /// Comment on a diff line. Without --batch the comment is published
    /// immediately; with it the comment waits for `review submit`.
    Create {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        pull: String,
        #[arg(long)]
        path: String,
        /// Signed diff line: positive for the new side, negative for the
        /// removed side.
        #[arg(long, allow_hyphen_values = true)]
        line: i64,
        #[arg(long)]
        content: String,
        #[arg(long)]
        batch: bool,
        #[arg(long)]
        reply_to: Option<String>,
        /// Head commit the comment was written against.
        #[arg(long)]
        commit: String,
    },
    List {
        #[arg(long)]
        pull: String,
    },
}

#[derive(Subcommand)]
enum ReviewCommand {
    Submit {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        pull: String,
        /// comment, approve, reject, or request-changes.
        #[arg(long)]
        kind: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long, default_value = "")]
        commit: String,
        #[arg(long)]
        official: bool,
        #[arg(long)]
        review: Option<String>,
    },
    Dismiss {
        #[arg(long)]
        review: String,
        #[arg(long)]
        repo: String,
        #[arg(long)]
        actor: String,
        #[arg(long, default_value = "")]
        message: String,
        /// Restore a dismissed review instead of dismissing it.
        #[arg(long)]
        undo: bool,
        /// Also dismiss the reviewer's other outstanding reviews on the pull.
        #[arg(long)]
        cascade: bool,
    },
    List {
        #[arg(long)]
        pull: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PerchError> {
    let db_path =
        std::env::var("PERCH_DB_PATH").unwrap_or_else(|_| ".perch/perch.db".to_string());
    if let Some(parent) = Path::new(&db_path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let repo_path = std::env::var("PERCH_REPO_PATH").unwrap_or_else(|_| ".".to_string());
    let config_path =
        std::env::var("PERCH_CONFIG").unwrap_or_else(|_| "perch.toml".to_string());

    let conn = perch_db::schema::open_and_migrate(&db_path).map_err(internal)?;
    let store = DbStore::new(conn);
    let diff = Box::new(GixContext::open(Path::new(&repo_path))?);
    let mut config = Config::load(Path::new(&config_path))?;
    if let Some(lines) = std::env::var("PERCH_CONTEXT_LINES")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
    {
        config.code_comment_context_lines = lines;
    }
    let perch = Perch::new(store, EventBus::new(1024), diff, config);
    let ctx = RequestContext::new(EventSource::Cli, None);

    match cli.command {
        Command::User(UserCommand::Create { handle, name }) => {
            let user = perch.users().create(
                &ctx,
                CreateUserInput {
                    handle,
                    display_name: name,
                },
            )?;
            println!("{} @{}", user.id.as_str().bold(), user.handle);
        }
        Command::User(UserCommand::Show { handle }) => {
            let user = perch
                .users()
                .get_by_handle(&handle)?
                .ok_or_else(|| invalid(format!("no user with handle {handle}")))?;
            print_json(&user)?;
        }
        Command::Pull(PullCommand::Register {
            repo,
            index,
            author,
            title,
            base,
            head,
        }) => {
            let pull = perch.pulls().register(
                &ctx,
                RegisterPullInput {
                    repo_id: RepoId::new(repo).map_err(invalid)?,
                    index,
                    author: UserId::new(author).map_err(invalid)?,
                    title,
                    base_ref: base,
                    head_ref: head,
                },
            )?;
            println!(
                "{} #{} {} ({}..{})",
                pull.id.as_str().bold(),
                pull.index,
                pull.title,
                pull.base_ref,
                pull.head_ref
            );
        }
        Command::Pull(PullCommand::List) => {
            for pull in perch.pulls().list()? {
                println!("{} #{} {}", pull.id.as_str().bold(), pull.index, pull.title);
            }
        }
        Command::Pull(PullCommand::Show { id }) => {
            let id = PullId::new(id).map_err(invalid)?;
            let pull = perch
                .pulls()
                .get(&id)?
                .ok_or_else(|| invalid("pull not found".to_string()))?;
            print_json(&pull)?;
        }
        Command::Comment(CommentCommand::Create {
            actor,
            pull,
            path,
            line,
            content,
            batch,
            reply_to,
            commit,
        }) => {
            let comment = perch.comments().create(
                &ctx,
                CreateCodeCommentInput {
                    actor: UserId::new(actor).map_err(invalid)?,
                    pull_id: PullId::new(pull).map_err(invalid)?,
                    tree_path: path,
                    line,
                    content,
                    part_of_batch: batch,
                    reply_to: reply_to.map(ReviewId::new).transpose().map_err(invalid)?,
                    latest_commit_id: commit,
                },
            )?;
            println!(
                "{} {}:{}",
                comment.id.as_str().bold(),
                comment.tree_path,
                comment.line
            );
        }
        Command::Comment(CommentCommand::List { pull }) => {
            let pull_id = PullId::new(pull).map_err(invalid)?;
            for comment in perch.comments().list_for_pull(&pull_id)? {
                let marker = if comment.invalidated {
                    "outdated".yellow().to_string()
                } else {
                    format!("{:?}", comment.kind)
                };
                println!(
                    "{} [{marker}] {}:{} {}",
                    comment.id.as_str().bold(),
                    comment.tree_path,
                    comment.line,
                    comment.content
                );
            }
        }
        Command::Review(ReviewCommand::Submit {
            actor,
            pull,
            kind,
            content,
            commit,
            official,
            review,
        }) => {
            let (review, _summary) = perch.reviews().submit(
                &ctx,
                SubmitReviewInput {
                    actor: UserId::new(actor).map_err(invalid)?,
                    pull_id: PullId::new(pull).map_err(invalid)?,
                    kind: parse_kind(&kind)?,
                    content,
                    commit_id: commit,
                    official,
                    attachments: Vec::new(),
                    review_id: review.map(ReviewId::new).transpose().map_err(invalid)?,
                },
            )?;
            let staleness = if review.stale {
                format!(" ({})", "stale".yellow())
            } else {
                String::new()
            };
            println!("{} {:?}{staleness}", review.id.as_str().bold(), review.kind);
        }
        Command::Review(ReviewCommand::Dismiss {
            review,
            repo,
            actor,
            message,
            undo,
            cascade,
        }) => {
            let comment = perch.reviews().dismiss(
                &ctx,
                DismissReviewInput {
                    review_id: ReviewId::new(review).map_err(invalid)?,
                    expected_repo_id: RepoId::new(repo).map_err(invalid)?,
                    message,
                    actor: UserId::new(actor).map_err(invalid)?,
                    dismiss: !undo,
                    cascade_priors: cascade,
                },
            )?;
            match comment {
                Some(comment) => println!("dismissed, audit comment {}", comment.id.as_str().bold()),
                None => println!("restored"),
            }
        }
        Command::Review(ReviewCommand::List { pull }) => {
            let pull_id = PullId::new(pull).map_err(invalid)?;
            let reviews = perch.reviews().list(ReviewFilter {
                pull_id: Some(pull_id),
                ..ReviewFilter::default()
            })?;
            for review in reviews {
                let mut flags = Vec::new();
                if review.official {
                    flags.push("official");
                }
                if review.stale {
                    flags.push("stale");
                }
                if review.dismissed {
                    flags.push("dismissed");
                }
                println!(
                    "{} {:?} by {} {}",
                    review.id.as_str().bold(),
                    review.kind,
                    review.reviewer.as_str(),
                    flags.join(",")
                );
            }
        }
        Command::Events { after, limit } => {
            for event in perch.events().list(after, limit)? {
                println!(
                    "{:>6} {} {}",
                    event.seq,
                    event.at.to_rfc3339(),
                    serde_json::to_string(&event.body).map_err(internal)?
                );
            }
        }
    }
    Ok(())
}

fn parse_kind(value: &str) -> Result<ReviewKind, PerchError> {
    match value {
        "comment" => Ok(ReviewKind::Comment),
        "approve" => Ok(ReviewKind::Approve),
        "reject" => Ok(ReviewKind::Reject),
        "request-changes" => Ok(ReviewKind::RequestChanges),
        other => Err(invalid(format!("unknown review kind: {other}")).into()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), PerchError> {
    let json = serde_json::to_string_pretty(value).map_err(internal)?;
    println!("{json}");
    Ok(())
}

fn invalid(message: impl std::fmt::Display) -> perch_core::error::PullError {
    perch_core::error::PullError::InvalidInput {
        message: message.to_string(),
    }
}

fn internal(err: impl std::fmt::Display) -> PerchError {
    PerchError::Internal {
        message: err.to_string(),
    }
}
