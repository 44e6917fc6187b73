use anyhow::Error;
use clap::{ArgGroup, Parser, Subcommand};
use std::fs::create_dir_all;
use std::path::PathBuf;

use crate::config::Config;
use crate::logger::init_logger;
use crate::sync_manager::SyncManager;
use crate::vk_connection::PageKind;

#[derive(Parser, Debug)]
#[command(name = "vkasync", version, about = "Sync VK audio tracks to a local directory")]
#[command(arg_required_else_help = true)]
pub struct VkasyncOpts {
    #[command(subcommand)]
    pub command: VkasyncCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum VkasyncCommand {
    /// Download audios
    Get {
        /// Email or phone number
        #[arg(short, long)]
        login: String,
        /// Path where to save audios
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Rewrite audio file if already exists
        #[arg(long)]
        rewrite: bool,
        /// User's page id or name
        #[arg(short, long, allow_hyphen_values = true)]
        uid: Option<String>,
        /// Group's page id or name
        #[arg(short, long, allow_hyphen_values = true)]
        gid: Option<String>,
    },
    /// Manage tokens
    #[command(group(ArgGroup::new("action").required(true).args(["add", "remove", "list"])))]
    Token {
        #[arg(short, long)]
        add: bool,
        #[arg(short, long)]
        remove: bool,
        /// List stored logins
        #[arg(long)]
        list: bool,
        /// Email or phone number
        #[arg(short, long, required_unless_present = "list")]
        login: Option<String>,
    },
}

impl VkasyncOpts {
    pub async fn process_args() -> Result<(), Error> {
        let opts = Self::parse();
        let config = Config::init_config()?;

        create_dir_all(&config.config_dir)?;
        init_logger(&config.log_path(), &config.log_level)?;

        opts.command.process(&config).await
    }
}

impl VkasyncCommand {
    pub async fn process(self, config: &Config) -> Result<(), Error> {
        let manager = SyncManager::new(config)?;
        match self {
            Self::Get {
                login,
                path,
                rewrite,
                uid,
                gid,
            } => {
                let (page_name, kind) = match gid {
                    Some(gid) => (Some(gid), PageKind::Group),
                    None => (uid, PageKind::User),
                };
                let session = match manager.open_session(&login).await? {
                    Some(session) => session,
                    None => {
                        println!("Authorization error");
                        return manager.disconnect();
                    }
                };
                let owner_id = match manager
                    .name_to_id(&session, page_name.as_deref(), kind)
                    .await?
                {
                    Some(owner_id) => owner_id,
                    None => {
                        println!("Invalid page name/id");
                        return manager.disconnect();
                    }
                };
                let errors = manager
                    .get_audios(&session, owner_id, path.as_deref(), rewrite)
                    .await?;
                println!("Process complete with {} errors", errors);
                if errors > 0 {
                    println!("See {} for details", manager.log_path.display());
                }
            }
            Self::Token {
                add,
                remove,
                list,
                login,
            } => {
                if list {
                    for login in manager.list_logins()? {
                        println!("{}", login);
                    }
                } else if let Some(login) = login {
                    if add {
                        if manager.check_login(&login)? {
                            println!("Login already added");
                            return manager.disconnect();
                        }
                        let password = rpassword::prompt_password("Password: ")?;
                        if manager.add_login(&login, &password).await? {
                            println!("Success");
                        } else {
                            println!("Authorization error");
                        }
                    } else if remove {
                        manager.rm_login(&login)?;
                    }
                }
            }
        }
        manager.disconnect()
    }
}
