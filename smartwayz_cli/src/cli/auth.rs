use clap::{Args, Subcommand};
use smartwayz_client::RegistrationForm;
use smartwayz_core::Role;

use crate::cli::common::{
    build_manager, load_api_config, print_profile, print_session, read_password,
};

#[derive(Debug, Args)]
pub(crate) struct AuthCommand {
    #[command(subcommand)]
    subcmd: AuthSubcommand,
}

#[derive(Debug, Subcommand)]
enum AuthSubcommand {
    /// Log in and persist the session.
    Login(LoginCommand),

    /// Create a citizen account.
    Register(RegisterCommand),

    /// Restore the stored session and show who is signed in.
    Status(StatusCommand),

    /// End the session here and on the backend.
    Logout(LogoutCommand),
}

impl AuthCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        match &self.subcmd {
            AuthSubcommand::Login(cmd) => cmd.run().await,
            AuthSubcommand::Register(cmd) => cmd.run().await,
            AuthSubcommand::Status(cmd) => cmd.run().await,
            AuthSubcommand::Logout(cmd) => cmd.run().await,
        }
    }
}

#[derive(Debug, Args)]
struct LoginCommand {
    #[arg(long)]
    email: String,

    #[arg(long, default_value = "citizen")]
    role: Role,
}

impl LoginCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let config = load_api_config()?;
        let manager = build_manager(&config)?;
        let password = read_password("Password")?;

        let user = manager.login(&self.email, &password, self.role).await?;

        println!("Signed in.");
        print_profile(&user);
        Ok(())
    }
}

#[derive(Debug, Args)]
struct RegisterCommand {
    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,
}

impl RegisterCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let config = load_api_config()?;
        let manager = build_manager(&config)?;
        let password = read_password("Password")?;
        let confirm_password = match std::env::var("SMARTWAYZ_PASSWORD") {
            Ok(password) => password,
            Err(_) => read_password("Confirm password")?,
        };

        let message = manager
            .register(&RegistrationForm {
                name: self.name.clone(),
                email: self.email.clone(),
                password,
                confirm_password,
            })
            .await?;

        println!("{message}");
        println!("Run `smartwayz auth login --email {}` to sign in.", self.email);
        Ok(())
    }
}

#[derive(Debug, Args)]
struct StatusCommand {}

impl StatusCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let config = load_api_config()?;
        let manager = build_manager(&config)?;

        let state = manager.restore().await;
        print_session(&state);
        Ok(())
    }
}

#[derive(Debug, Args)]
struct LogoutCommand {}

impl LogoutCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let config = load_api_config()?;
        let manager = build_manager(&config)?;

        if manager.client().adopt_stored_session()?.is_none() {
            println!("No stored session.");
            return Ok(());
        }
        manager.logout().await;
        println!("Signed out.");
        Ok(())
    }
}
