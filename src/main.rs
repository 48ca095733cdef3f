use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand};
use hermes_graph::ResultLimit;

#[derive(Debug, Parser)]
#[command(name = "hermes-graph", version, about = "Microsoft Graph mail, planner and directory client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output structured JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read, send, move and forward mail
    Messages {
        #[command(subcommand)]
        command: MessageCommands,
    },
    /// List or download message attachments
    Attachments {
        #[command(subcommand)]
        command: AttachmentCommands,
    },
    /// Mailbox folders
    Folders {
        #[command(subcommand)]
        command: FolderCommands,
    },
    /// Planner plans
    Plans {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Planner tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Directory users
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Show license SKUs subscribed by the tenant
    Licenses,
    /// Show the permissions carried by the app token
    Permissions,
}

#[derive(Debug, Subcommand)]
enum MessageCommands {
    /// List messages with optional filters
    List(ListArgs),
    /// Show one message by ID
    Show { mailbox: String, id: String },
    /// Send a message
    Send(SendArgs),
    /// Move a message to another folder
    Move(MoveArgs),
    /// Forward a message
    Forward {
        mailbox: String,
        id: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        comment: Option<String>,
    },
}

#[derive(Debug, Args)]
struct ListArgs {
    mailbox: String,
    /// Folder display name
    #[arg(long)]
    folder: Option<String>,
    /// Subject pattern: `*text*`, `text*` or `text`
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    sender: Option<String>,
    /// Received after (ISO-8601)
    #[arg(long)]
    after: Option<String>,
    /// Received before (ISO-8601)
    #[arg(long)]
    before: Option<String>,
    #[arg(long)]
    has_attachments: Option<bool>,
    /// Positive count or `all`
    #[arg(long, default_value = "10")]
    limit: ResultLimit,
}

#[derive(Debug, Args)]
struct SendArgs {
    sender: String,
    #[arg(long, required = true)]
    to: Vec<String>,
    #[arg(long)]
    cc: Vec<String>,
    #[arg(long)]
    subject: String,
    #[arg(long)]
    body: String,
    /// Send the body as HTML
    #[arg(long, default_value_t = false)]
    html: bool,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("destination").required(true).args(["folder", "folder_id"])))]
struct MoveArgs {
    mailbox: String,
    id: String,
    /// Destination folder display name
    #[arg(long)]
    folder: Option<String>,
    /// Destination folder ID
    #[arg(long)]
    folder_id: Option<String>,
}

#[derive(Debug, Subcommand)]
enum AttachmentCommands {
    /// List attachments of a message
    List { mailbox: String, message_id: String },
    /// Download an attachment to disk
    Download {
        mailbox: String,
        message_id: String,
        attachment_id: String,
        /// Target path; defaults to the attachment name
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum FolderCommands {
    /// List every folder in a mailbox
    List { mailbox: String },
}

#[derive(Debug, Subcommand)]
enum PlanCommands {
    /// Plans owned by a group
    Group { group_id: String },
    /// Plans visible to a user
    User { user_id: String },
}

#[derive(Debug, Subcommand)]
enum TaskCommands {
    /// Tasks assigned to a user
    User { user_id: String },
    /// Tasks of a plan, with descriptions
    Plan { plan_id: String },
}

#[derive(Debug, Subcommand)]
enum UserCommands {
    /// List member accounts
    List {
        /// Only name, job title, mail and office
        #[arg(long, default_value_t = false)]
        simple: bool,
    },
    /// Search users by display name
    Search { query: String },
    /// Resolve a user's directory ID from an email address
    Id { email: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::dispatch(cli).await
}

mod commands {
    use std::path::PathBuf;

    use anyhow::{anyhow, Context, Result};

    use hermes_graph::output::{self, OutputFormat};
    use hermes_graph::services::{BodyType, FolderRef, OutgoingMail, UserView};
    use hermes_graph::{FilterCriteria, GraphClient, GraphConfig};

    use super::{
        AttachmentCommands, Cli, Commands, FolderCommands, MessageCommands, PlanCommands,
        TaskCommands, UserCommands,
    };

    pub async fn dispatch(cli: Cli) -> Result<()> {
        let format = OutputFormat::from_json_flag(cli.json);
        let client = connect().await?;

        match cli.command {
            Commands::Messages { command } => handle_messages(&client, command, format).await,
            Commands::Attachments { command } => handle_attachments(&client, command, format).await,
            Commands::Folders { command } => handle_folders(&client, command, format).await,
            Commands::Plans { command } => handle_plans(&client, command, format).await,
            Commands::Tasks { command } => handle_tasks(&client, command, format).await,
            Commands::Users { command } => handle_users(&client, command, format).await,
            Commands::Licenses => handle_licenses(&client, format).await,
            Commands::Permissions => handle_permissions(&client, format).await,
        }
    }

    async fn connect() -> Result<GraphClient> {
        let config = GraphConfig::from_env().context("load Graph credentials")?;
        GraphClient::connect(&config)
            .await
            .context("acquire Microsoft Graph access token")
    }

    async fn handle_messages(
        client: &GraphClient,
        command: MessageCommands,
        format: OutputFormat,
    ) -> Result<()> {
        let email = client.email();
        match command {
            MessageCommands::List(args) => {
                let criteria = FilterCriteria {
                    subject: args.subject,
                    sender: args.sender,
                    received_after: args.after,
                    received_before: args.before,
                    has_attachments: args.has_attachments,
                    limit: Some(args.limit),
                };
                let messages = email
                    .list_messages(&args.mailbox, args.folder.as_deref(), &criteria)
                    .await
                    .with_context(|| format!("list messages for {}", args.mailbox))?;
                println!("{}", output::format_messages(format, &messages)?);
            }
            MessageCommands::Show { mailbox, id } => {
                let message = email
                    .get_message(&mailbox, &id)
                    .await
                    .with_context(|| format!("fetch message {id}"))?;
                println!("{}", output::format_message(format, &message)?);
            }
            MessageCommands::Send(args) => {
                let mail = OutgoingMail {
                    subject: args.subject,
                    body: args.body,
                    body_type: if args.html { BodyType::Html } else { BodyType::Text },
                    to: args.to,
                    cc: args.cc,
                };
                email
                    .send_mail(&args.sender, &mail)
                    .await
                    .with_context(|| format!("send mail as {}", args.sender))?;
                println!("Sent: {}", mail.subject);
            }
            MessageCommands::Move(args) => {
                let destination = match (args.folder, args.folder_id) {
                    (_, Some(folder_id)) => FolderRef::Id(folder_id),
                    (Some(folder), None) => FolderRef::Name(folder),
                    (None, None) => return Err(anyhow!("pass --folder or --folder-id")),
                };
                let moved = email
                    .move_message(&args.mailbox, &args.id, &destination)
                    .await
                    .with_context(|| format!("move message {}", args.id))?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&moved)?),
                    OutputFormat::Table => {
                        let new_id = moved.get("id").and_then(|id| id.as_str()).unwrap_or("-");
                        println!("Moved message; new ID: {new_id}");
                    }
                }
            }
            MessageCommands::Forward {
                mailbox,
                id,
                to,
                comment,
            } => {
                email
                    .forward_message(&mailbox, &id, &to, comment.as_deref())
                    .await
                    .with_context(|| format!("forward message {id} to {to}"))?;
                println!("Forwarded to {to}");
            }
        }
        Ok(())
    }

    async fn handle_attachments(
        client: &GraphClient,
        command: AttachmentCommands,
        format: OutputFormat,
    ) -> Result<()> {
        match command {
            AttachmentCommands::List {
                mailbox,
                message_id,
            } => {
                let attachments = client
                    .email()
                    .list_attachments(&mailbox, &message_id)
                    .await
                    .with_context(|| format!("list attachments of {message_id}"))?;
                println!("{}", output::format_attachments(format, &attachments)?);
            }
            AttachmentCommands::Download {
                mailbox,
                message_id,
                attachment_id,
                output: target,
            } => {
                let attachment = client
                    .email()
                    .download_attachment(&mailbox, &message_id, &attachment_id)
                    .await
                    .with_context(|| format!("download attachment {attachment_id}"))?;
                let path = match target {
                    Some(target) => PathBuf::from(target),
                    None => PathBuf::from(
                        attachment
                            .name
                            .as_deref()
                            .filter(|name| !name.trim().is_empty())
                            .ok_or_else(|| anyhow!("attachment has no name; pass --output"))?,
                    ),
                };
                std::fs::write(&path, &attachment.bytes)
                    .with_context(|| format!("write attachment to {}", path.display()))?;
                println!("Saved {} bytes to {}", attachment.bytes.len(), path.display());
            }
        }
        Ok(())
    }

    async fn handle_folders(
        client: &GraphClient,
        command: FolderCommands,
        format: OutputFormat,
    ) -> Result<()> {
        match command {
            FolderCommands::List { mailbox } => {
                let folders = client
                    .folders()
                    .list_folders(&mailbox)
                    .await
                    .with_context(|| format!("list folders for {mailbox}"))?;
                println!("{}", output::format_folders(format, &folders)?);
            }
        }
        Ok(())
    }

    async fn handle_plans(
        client: &GraphClient,
        command: PlanCommands,
        format: OutputFormat,
    ) -> Result<()> {
        let planner = client.planner();
        let plans = match command {
            PlanCommands::Group { group_id } => planner
                .group_plan_summaries(&group_id)
                .await
                .with_context(|| format!("list plans of group {group_id}"))?,
            PlanCommands::User { user_id } => planner
                .user_plans(&user_id)
                .await
                .with_context(|| format!("list plans visible to {user_id}"))?,
        };
        println!("{}", output::format_plans(format, &plans)?);
        Ok(())
    }

    async fn handle_tasks(
        client: &GraphClient,
        command: TaskCommands,
        format: OutputFormat,
    ) -> Result<()> {
        let planner = client.planner();
        let tasks = match command {
            TaskCommands::User { user_id } => planner
                .user_tasks(&user_id)
                .await
                .with_context(|| format!("list tasks of {user_id}"))?,
            TaskCommands::Plan { plan_id } => planner
                .plan_tasks_with_details(&plan_id)
                .await
                .with_context(|| format!("list tasks of plan {plan_id}"))?,
        };
        println!("{}", output::format_tasks(format, &tasks)?);
        Ok(())
    }

    async fn handle_users(
        client: &GraphClient,
        command: UserCommands,
        format: OutputFormat,
    ) -> Result<()> {
        let users = client.users();
        match command {
            UserCommands::List { simple } => {
                let view = if simple { UserView::Simple } else { UserView::Full };
                let listed = users.list_users(view).await.context("list users")?;
                println!("{}", output::format_users(format, &listed)?);
            }
            UserCommands::Search { query } => {
                let found = users
                    .search_users(&query)
                    .await
                    .with_context(|| format!("search users for '{query}'"))?;
                println!("{}", output::format_users(format, &found)?);
            }
            UserCommands::Id { email } => {
                let id = users
                    .user_id_by_email(&email)
                    .await
                    .with_context(|| format!("resolve user {email}"))?
                    .ok_or_else(|| anyhow!("no user found for {email}"))?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "id": id }))?)
                    }
                    OutputFormat::Table => println!("{id}"),
                }
            }
        }
        Ok(())
    }

    async fn handle_licenses(client: &GraphClient, format: OutputFormat) -> Result<()> {
        let licenses = client
            .users()
            .tenant_licenses()
            .await
            .context("list tenant licenses")?;
        println!("{}", output::format_licenses(format, &licenses)?);
        Ok(())
    }

    async fn handle_permissions(client: &GraphClient, format: OutputFormat) -> Result<()> {
        let report = client.permissions().await.context("decode access token")?;
        println!("{}", output::format_permissions(format, &report)?);
        Ok(())
    }
}
