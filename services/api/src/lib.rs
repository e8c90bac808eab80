mod cli;
mod infra;
mod routes;
mod seed;
mod server;

use treehub::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
