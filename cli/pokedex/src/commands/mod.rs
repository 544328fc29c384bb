mod browse;
mod favorite;
mod list;
mod names;
mod show;

use std::fmt;

use anyhow::Result;
use bpaf::{Bpaf, ParseFailure, Parser};
use indoc::indoc;
use pokedex_catalog::{CatalogSession, Client, FileStore};

use crate::config::Config;
use crate::utils::init::init_catalog_client;
use crate::utils::message;

static POKEDEX_DESCRIPTION: &'_ str = indoc! {"
    Browse the Pokédex from the command line.\n\n

    Entries are loaded page by page from the catalog API,
    can be searched and sorted, and marked as favorites."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, descr(POKEDEX_DESCRIPTION))]
pub struct PokedexCli(#[bpaf(external(pokedex_args))] pub PokedexArgs);

/// Main pokedex args parser
///
/// To parse the pokedex CLI, use [`PokedexCli`] instead using [`pokedex_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)] // we don't want this struct to be interpreted as a group
pub struct PokedexArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    /// Print the version of the program
    #[allow(dead_code)] // fake arg, `--version` is checked for separately (see [Version])
    #[bpaf(long, short('V'))]
    version: bool,

    #[bpaf(external(commands), optional)]
    command: Option<Commands>,
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command")
    }
}

impl PokedexArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        let Some(command) = self.command else {
            display_help(None);
            return Ok(());
        };

        let client = init_catalog_client(&config)?;
        command.handle(config, client).await
    }
}

#[derive(Bpaf, Clone)]
enum Commands {
    /// List entries of the catalog
    #[bpaf(command, short('l'))]
    List(#[bpaf(external(list::list))] list::List),

    /// Show details about a single entry
    #[bpaf(command)]
    Show(#[bpaf(external(show::show))] show::Show),

    /// Print the names of all entries in the catalog
    #[bpaf(command)]
    Names(#[bpaf(external(names::names))] names::Names),

    /// Mark or unmark an entry as favorite
    #[bpaf(command)]
    Favorite(#[bpaf(external(favorite::favorite))] favorite::Favorite),

    /// List favorite entries
    #[bpaf(command)]
    Favorites(#[bpaf(external(favorite::favorites))] favorite::Favorites),

    /// Interactively search and page through the catalog
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),
}

impl Commands {
    async fn handle(self, config: Config, client: Client) -> Result<()> {
        match self {
            Commands::List(args) => args.handle(open_session(&config, client)).await?,
            Commands::Show(args) => args.handle(open_session(&config, client)).await?,
            Commands::Names(args) => args.handle(config, client).await?,
            Commands::Favorite(args) => args.handle(open_session(&config, client))?,
            Commands::Favorites(args) => args.handle(open_session(&config, client)).await?,
            Commands::Browse(args) => args.handle(open_session(&config, client)).await?,
        }
        Ok(())
    }
}

pub type Session = CatalogSession<Client, FileStore>;

fn open_session(config: &Config, client: Client) -> Session {
    CatalogSession::new(
        client,
        FileStore::new(&config.data_dir),
        config.session_config(),
    )
}

/// Force `--help` output for `pokedex` with a given command
pub fn display_help(cmd: Option<String>) {
    let mut args = Vec::from_iter(cmd.as_deref());
    args.push("--help");

    match pokedex_cli().run_inner(&*args) {
        Ok(_) => unreachable!(),
        Err(ParseFailure::Completion(comp)) => print!("{comp:80}"),
        Err(ParseFailure::Stdout(doc, _)) => message::plain(format!("{doc:80}")),
        Err(ParseFailure::Stderr(err)) => message::error(err),
    }
}

/// Fake argument used to parse `--version` separately
///
/// bpaf allows `pokedex --invalid option --version`
/// (https://github.com/pacak/bpaf/issues/288) but common utilities,
/// such as git always require correct arguments even in the presence of
/// short circuiting flags such as `--version`
#[derive(Bpaf, Default)]
pub struct Version(#[bpaf(short('V'), long("version"))] bool);

impl Version {
    /// Parses to [Self] and extract the `--version` flag
    pub fn check() -> bool {
        bpaf::construct!(version(), pokedex_args())
            .to_options()
            .run_inner(bpaf::Args::current_args())
            .map(|(v, _)| v)
            .unwrap_or_default()
            .0
    }
}
