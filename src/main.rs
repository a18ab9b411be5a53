use std::{net::TcpListener, sync::Arc};

use actix_web::web;
use anyhow::Context;
use env_logger::Env;
use scout::{
    configuration::get_configuration,
    domain::history::SearchHistory,
    services::{SearchPipeline, TelegramBot},
    startup::run,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration")?;

    let pipeline = Arc::new(
        SearchPipeline::new(configuration.search.clone()).context("Failed to build http client")?,
    );
    let history = Arc::new(SearchHistory::new(configuration.search.history_capacity));

    match configuration.bot.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => {
            let bot = TelegramBot::new(&configuration.bot, token, pipeline.clone(), history.clone())
                .context("Failed to build telegram client")?;
            tokio::spawn(Arc::new(bot).run());
        }
        None => log::info!("No bot token configured, telegram bot disabled"),
    }

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address).with_context(|| format!("Failed to bind {}", address))?;
    log::info!("Listening on {}", address);

    run(listener, web::Data::from(pipeline), web::Data::from(history))?.await?;
    Ok(())
}
