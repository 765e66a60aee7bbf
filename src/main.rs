use std::io::{self, Write};

use anyhow::Context;
use env_logger::Env;
use jucesp::{
    configuration::get_configuration,
    domain::SearchQuery,
    services::{search_company, ConsoleResolver},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().expect("Failed to read configuration.");

    print!("Digite o nome ou NIRE a pesquisar: ");
    io::stdout().flush()?;
    let mut term = String::new();
    io::stdin().read_line(&mut term)?;

    let query = SearchQuery::new(term.trim());
    let mut resolver = ConsoleResolver;

    let outcome = search_company(query, &configuration, &mut resolver)
        .await
        .context("company search failed")?;

    if outcome.has_content() {
        println!("Resultado da busca:");
        println!("{}", outcome);
    }

    Ok(())
}
