use anyhow::{Context, Result};
use bpaf::Bpaf;
use indoc::indoc;
use pokedex_catalog::types::format_id;
use pokedex_catalog::{Completion, SortMode};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, instrument};

use super::Session;
use super::list::DisplayItems;
use crate::utils::message;

const BROWSE_HELP: &str = indoc! {"
    Type to search, results update once you stop typing.
    Commands:
      :more           load the next page
      :refresh        reload the catalog from the first page
      :sort <mode>    sort by 'name', 'type' or 'power'
      :fav <id>       mark or unmark an entry as favorite
      :show <name>    show details about an entry
      :help           show this help
      :quit           exit
"};

// Interactively search and page through the catalog
#[derive(Debug, Bpaf, Clone)]
pub struct Browse {
    /// Initial sort order: 'name', 'type' or 'power'
    #[bpaf(long, argument("mode"), fallback(SortMode::ByName))]
    pub sort: SortMode,
}

/// A line of input in the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Search(String),
    More,
    Refresh,
    Sort(SortMode),
    Favorite(u32),
    Show(String),
    Help,
    Quit,
    Invalid(String),
}

impl Input {
    fn parse(line: &str) -> Input {
        let Some(command) = line.trim().strip_prefix(':') else {
            return Input::Search(line.trim().to_string());
        };
        let (command, argument) = command
            .split_once(char::is_whitespace)
            .map(|(command, argument)| (command, argument.trim()))
            .unwrap_or((command, ""));

        match command {
            "more" | "m" => Input::More,
            "refresh" | "r" => Input::Refresh,
            "sort" | "s" => match argument.parse() {
                Ok(mode) => Input::Sort(mode),
                Err(e) => Input::Invalid(format!("{e}")),
            },
            "fav" | "f" => match argument.parse() {
                Ok(id) => Input::Favorite(id),
                Err(_) => Input::Invalid(format!("'{argument}' is not a valid number")),
            },
            "show" if !argument.is_empty() => Input::Show(argument.to_string()),
            "show" => Input::Invalid("':show' needs a name".to_string()),
            "help" | "h" | "?" => Input::Help,
            "quit" | "q" | "exit" => Input::Quit,
            other => Input::Invalid(format!("unknown command ':{other}'")),
        }
    }
}

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle(self, mut session: Session) -> Result<()> {
        session.set_sort_mode(self.sort);
        message::plain(BROWSE_HELP);

        session.load_first_page().await;
        render(&session);

        let mut updates = session.search_updates();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("could not read input")? else {
                        break;
                    };
                    if !handle_input(&mut session, Input::parse(&line)).await {
                        break;
                    }
                },
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    debug!(term = %session.applied_search_term(), "search term applied");
                    render(&session);
                },
            }
        }
        Ok(())
    }
}

/// Returns `false` once the browser should exit.
async fn handle_input(session: &mut Session, input: Input) -> bool {
    match input {
        Input::Search(term) => session.set_search_term(term),
        Input::More => match session.load_next_page().await {
            Some(Completion::Applied) => render(session),
            Some(Completion::Failed) => report_error(session),
            Some(Completion::Discarded) => {},
            None if !session.has_more() => message::plain("All entries are loaded"),
            None => message::plain("Still loading, try again in a moment"),
        },
        Input::Refresh => match session.refresh().await {
            Completion::Applied => render(session),
            Completion::Failed => report_error(session),
            Completion::Discarded => {},
        },
        Input::Sort(mode) => {
            session.set_sort_mode(mode);
            render(session);
        },
        Input::Favorite(id) => {
            if session.toggle_favorite(id) {
                message::created(format!("Added {} to favorites", format_id(id)));
            } else {
                message::deleted(format!("Removed {} from favorites", format_id(id)));
            }
        },
        Input::Show(name) => match session.detail(&name).await {
            Ok(record) => message::plain(format!(
                "{} {}: {}",
                record.display_name(),
                record.type_tags.join("/"),
                record.flavor_text.as_deref().unwrap_or("no description"),
            )),
            Err(e) => message::error(format!("could not find '{name}': {e}")),
        },
        Input::Help => message::plain(BROWSE_HELP),
        Input::Quit => return false,
        Input::Invalid(reason) => message::warning(reason),
    }
    true
}

fn report_error(session: &Session) {
    if let Some(err) = session.last_error() {
        message::error(format!("failed to load entries: {err}"));
    }
}

fn render(session: &Session) {
    let items = session.visible_items();
    if items.is_empty() {
        if session.last_error().is_some() {
            report_error(session);
        } else {
            message::plain("No entries found");
        }
        return;
    }

    print!("{}", DisplayItems::new(&items, session.favorites()));

    let term = session.applied_search_term();
    let mut summary = format!(
        "{} of {} loaded entries, sorted by {}",
        items.len(),
        session.collection().len(),
        session.sort_mode()
    );
    if !term.trim().is_empty() {
        summary.push_str(&format!(", matching '{}'", term.trim()));
    }
    if session.has_more() {
        summary.push_str(" (':more' loads more)");
    }
    message::plain(summary);
}
