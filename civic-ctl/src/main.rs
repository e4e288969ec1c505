use anyhow::{anyhow, Context};
use civic_client::{
    api::{CommentId, Issue, IssueId, NewIssue, NewUser, SetStatus, UpvoteRequest, UserId, Uuid},
    render, with_prefix, ReplyState, ThreadView,
};
use structopt::StructOpt;

mod api;

#[derive(structopt::StructOpt)]
#[structopt(name = "civic-ctl", about = "Command-line client for the civic server")]
struct Opt {
    #[structopt(short, long, env = "CIVIC_HOST", default_value = "http://127.0.0.1:3000")]
    host: String,

    /// User to act as
    #[structopt(short, long, env = "CIVIC_USER")]
    user: Option<Uuid>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Create a user
    CreateUser { name: String, email: String },

    /// List all users
    Users,

    /// Report an issue, as --user
    CreateIssue {
        title: String,

        #[structopt(long)]
        description: String,

        #[structopt(long)]
        category: String,

        #[structopt(long)]
        address: String,
    },

    /// List issues, newest first
    Issues,

    /// List the issues reported by --user, newest first
    MyIssues,

    /// Show one issue
    Issue { issue: Uuid },

    /// Move an issue to Open, Working or Resolve
    SetStatus { issue: Uuid, status: String },

    /// Add or remove the upvote of --user
    Upvote { issue: Uuid },

    /// Print the comment thread of an issue
    Thread { issue: Uuid },

    /// Comment on an issue as --user, or reply to a comment of it with --parent
    Comment {
        issue: Uuid,

        text: String,

        #[structopt(long)]
        parent: Option<Uuid>,
    },
}

fn print_json(v: &impl serde::Serialize) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(v).context("serializing server answer")?
    );
    Ok(())
}

fn print_issues(issues: &[Issue]) {
    for i in issues {
        let mark = if i.has_upvoted { "*" } else { " " };
        println!(
            "{} [{}] {mark}{:>3} {} ({}, {})",
            i.id.0, i.status, i.upvotes, i.title, i.category, i.address
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = Opt::from_args();
    let user = opt.user.map(UserId);
    let mut client = api::Client::new(opt.host);

    match opt.cmd {
        Command::CreateUser { name, email } => {
            print_json(&client.create_user(&NewUser::new(name, email)).await?)?;
        }
        Command::Users => {
            for u in client.fetch_users().await? {
                println!("{} {} <{}>", u.id.0, u.name, u.email);
            }
        }
        Command::CreateIssue {
            title,
            description,
            category,
            address,
        } => {
            let issue = NewIssue {
                user_id: user,
                title,
                description,
                category,
                address,
            };
            print_json(&client.create_issue(&issue).await?)?;
        }
        Command::Issues => print_issues(&client.fetch_issues(user).await?),
        Command::MyIssues => {
            let user = user.ok_or_else(|| anyhow!("my-issues needs --user"))?;
            print_issues(&client.fetch_user_issues(user).await?);
        }
        Command::Issue { issue } => {
            print_json(&client.fetch_issue(IssueId(issue), user).await?)?;
        }
        Command::SetStatus { issue, status } => {
            let issue = client
                .set_status(IssueId(issue), &SetStatus { status })
                .await?;
            println!("{} is now {}", issue.id.0, issue.status);
        }
        Command::Upvote { issue } => {
            let state = client
                .toggle_upvote(IssueId(issue), &UpvoteRequest { user_id: user })
                .await?;
            print_json(&state)?;
        }
        Command::Thread { issue } => {
            let mut view = ThreadView::new(IssueId(issue), user);
            view.load(&mut client).await?;
            print!("{}", render::render_thread(&view));
        }
        Command::Comment {
            issue,
            text,
            parent,
        } => {
            let mut view = ThreadView::new(IssueId(issue), user);
            view.load(&mut client).await?;
            match parent {
                None => {
                    view.post_comment(&mut client, text).await?;
                }
                Some(parent) => {
                    if !view.open_reply(CommentId(parent)) {
                        return Err(anyhow!(
                            "comment {parent} is not part of issue {}",
                            view.issue().0
                        ));
                    }
                    // keep the mention the reply box was seeded with
                    if let ReplyState::Composing { text: seed, .. } = view.reply_state() {
                        let full = with_prefix(seed, &text);
                        view.edit_reply(full);
                    }
                    view.submit_reply(&mut client).await?;
                }
            }
            print!("{}", render::render_thread(&view));
        }
    }

    Ok(())
}
