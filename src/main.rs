use std::{process, sync::Arc, time::Duration};

use tokio::{sync::Notify, task::JoinHandle};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        accounts::AccountService,
        error::AppError,
        groups::{CreateGroupCommand, GroupService},
    },
    config,
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, HttpOptions, HttpState},
        telemetry,
        uploads::UploadStorage,
    },
};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Groups(args) => run_groups(settings, args).await,
        config::Command::Users(args) => run_users(settings, args).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<SqliteRepositories>, AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(InfraError::from)?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(Arc::new(SqliteRepositories::new(pool)))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let media = Arc::new(
        UploadStorage::new(settings.media.directory.clone())
            .map_err(InfraError::from)?,
    );

    let options = HttpOptions::from_settings(&settings);
    let state = HttpState::build(repositories, media, &options);
    let purge_handle = spawn_session_purge(state.accounts.clone());

    let result = serve_http(&settings, state).await;

    purge_handle.abort();
    let _ = purge_handle.await;

    result
}

fn spawn_session_purge(accounts: Arc<AccountService>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match accounts.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => {
                    info!(target: "yatube::auth", removed, "purged expired sessions")
                }
                Err(err) => {
                    warn!(target: "yatube::auth", error = %err, "failed to purge sessions")
                }
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(target: "yatube::http", addr = %settings.server.addr, "listening");

    let stop = Arc::new(Notify::new());
    let stop_signal = stop.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move { stop_signal.notified().await })
            .await
    });

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        () = shutdown_signal() => {}
    }

    info!(target: "yatube::http", "shutting down");
    stop.notify_one();
    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!(
                target: "yatube::http",
                grace_ms = settings.server.graceful_shutdown.as_millis() as u64,
                "connections still open after grace period; exiting"
            );
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<Result<(), std::io::Error>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target: "yatube::http", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(target: "yatube::http", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

async fn run_groups(settings: config::Settings, args: config::GroupsArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let groups = GroupService::new(repositories.clone(), repositories);

    match args.command {
        config::GroupsCommand::Create(create) => {
            let group = groups
                .create(CreateGroupCommand {
                    title: create.title,
                    slug: create.slug,
                    description: create.description,
                })
                .await?;
            info!(
                target: "yatube::cli::groups",
                id = group.id,
                slug = %group.slug,
                "group created"
            );
            println!("{}\t{}\t{}", group.id, group.slug, group.title);
        }
        config::GroupsCommand::List(_) => {
            let list = groups.list().await?;
            for group in list {
                println!("{}\t{}\t{}", group.id, group.slug, group.title);
            }
        }
        config::GroupsCommand::Delete(delete) => {
            let removed = groups.delete(&delete.slug).await?;
            if !removed {
                return Err(AppError::NotFound);
            }
            info!(target: "yatube::cli::groups", slug = %delete.slug, "group deleted");
        }
    }

    Ok(())
}

async fn run_users(settings: config::Settings, args: config::UsersArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let session_ttl =
        time::Duration::try_from(settings.auth.session_ttl).unwrap_or(time::Duration::days(14));
    let accounts = AccountService::new(
        repositories.clone(),
        repositories.clone(),
        repositories,
        session_ttl,
        settings.auth.secret_key.clone().unwrap_or_default(),
    );

    match args.command {
        config::UsersCommand::Delete(delete) => {
            let removed = accounts.delete_user(&delete.username).await?;
            if !removed {
                return Err(AppError::NotFound);
            }
        }
    }

    Ok(())
}
