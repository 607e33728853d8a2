//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Args, Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use transmap_core::{MappingDirection, MappingType};

/// Transmap CLI - Build, validate, compose and execute API interface mappings
///
/// Works against file-backed stores: an attribute graph learned from past
/// mappings and a collection of persisted mappings.
#[derive(Parser, Debug)]
#[command(
    name = "transmap",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TRANSMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the leaf key chains of a schema
    Tree(TreeArgs),

    /// Classify, invert or evaluate mapping expressions
    Expr(ExprArgs),

    /// Query and extend the attribute knowledge graph
    Graph(GraphArgs),

    /// Suggest mapping pairs between two interfaces
    Suggest(SuggestArgs),

    /// Compile mapping pairs into a mapping tree
    Compile(CompileArgs),

    /// Turn a mapping tree back into mapping pairs
    Decompile(DecompileArgs),

    /// Import and inspect persisted mappings
    Mappings(MappingsArgs),

    /// Compose persisted mappings transitively between two interfaces
    Chain(ChainArgs),

    /// Check that a mapping covers every required leaf
    Validate(ValidateArgs),

    /// Run a mapping against a payload
    Execute(ExecuteArgs),

    /// Manage configuration files and settings
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the tree command
#[derive(Parser, Debug)]
pub struct TreeArgs {
    /// JSON Schema file (JSON or YAML)
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// Interface id prefixed to every key chain
    #[arg(short, long)]
    pub interface: Option<String>,

    /// The file already holds a type tree rather than a JSON Schema
    #[arg(long)]
    pub type_tree: bool,
}

/// Arguments for the expr command
#[derive(Parser, Debug)]
pub struct ExprArgs {
    #[command(subcommand)]
    pub action: ExprAction,
}

/// Expression actions
#[derive(Subcommand, Debug)]
pub enum ExprAction {
    /// Report whether an expression is simple and references a path
    Classify {
        /// Expression source
        expression: String,
    },

    /// Invert a simple expression
    Invert {
        /// Attribute id the inverse reads from
        attribute: String,
        /// Expression source
        expression: String,
    },

    /// Evaluate an expression against a JSON document
    Eval {
        /// Expression source
        expression: String,

        /// Input document (JSON or YAML); an empty object when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

/// Store location overrides shared by store-backed commands
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Attribute graph file (overrides the configured location)
    #[arg(long, global = true)]
    pub graph: Option<PathBuf>,

    /// Mappings file (overrides the configured location)
    #[arg(long, global = true)]
    pub mappings: Option<PathBuf>,
}

/// Arguments for the graph command
#[derive(Parser, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub stores: StoreArgs,

    #[command(subcommand)]
    pub action: GraphAction,
}

/// Attribute graph actions
#[derive(Subcommand, Debug)]
pub enum GraphAction {
    /// Record a transformation and its inverse
    Add {
        /// Attribute the transformation reads
        source: String,
        /// Attribute the transformation produces
        target: String,
        /// Transformation expression reading exactly the source attribute
        transformation: String,
    },

    /// Show every attribute reachable from an attribute
    Component {
        /// Attribute id
        id: String,

        /// In-flight mapping pairs to include (JSON)
        #[arg(long)]
        pairs: Option<PathBuf>,
    },

    /// Show the composed transformation between two attributes
    Path {
        /// Attribute to start from
        source: String,
        /// Attribute to reach
        target: String,

        /// In-flight mapping pairs to include (JSON)
        #[arg(long)]
        pairs: Option<PathBuf>,
    },
}

/// Arguments for the suggest command
#[derive(Parser, Debug)]
pub struct SuggestArgs {
    /// Interface whose leaves must be produced
    pub required: String,

    /// Interfaces whose leaves are available
    #[arg(required = true, num_args = 1..)]
    pub provided: Vec<String>,

    /// Type trees by interface id (JSON or YAML)
    #[arg(short, long)]
    pub schemas: PathBuf,

    /// Which part of the interfaces to pair up
    #[arg(short, long, value_enum, default_value = "response")]
    pub part: PartArg,

    /// Keep one suggestion per provided interface for each required leaf,
    /// as input message mappings are compiled per target
    #[arg(long)]
    pub per_provider: bool,

    #[command(flatten)]
    pub stores: StoreArgs,
}

/// Arguments for the compile command
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Mapping pairs file (JSON or YAML)
    #[arg(value_name = "PAIRS")]
    pub pairs: PathBuf,

    /// Direction the pairs are keyed in
    #[arg(short, long, value_enum, default_value = "input")]
    pub direction: DirectionArg,
}

/// Arguments for the decompile command
#[derive(Parser, Debug)]
pub struct DecompileArgs {
    /// Mapping tree file (JSON or YAML)
    #[arg(value_name = "TREE")]
    pub tree: PathBuf,

    /// Direction the tree was compiled in
    #[arg(short, long, value_enum, default_value = "input")]
    pub direction: DirectionArg,
}

/// Arguments for the mappings command
#[derive(Parser, Debug)]
pub struct MappingsArgs {
    #[command(flatten)]
    pub stores: StoreArgs,

    #[command(subcommand)]
    pub action: MappingsAction,
}

/// Mapping store actions
#[derive(Subcommand, Debug)]
pub enum MappingsAction {
    /// Persist a mapping file
    Import {
        /// Mapping file (JSON or YAML)
        file: PathBuf,

        /// Also record the mapping's simple transformations in the attribute graph
        #[arg(long)]
        learn: bool,
    },

    /// List persisted mappings
    List {
        /// Only list mappings of this type
        #[arg(long = "type", value_enum)]
        mapping_type: Option<MappingTypeArg>,
    },

    /// Show one persisted mapping
    Show {
        /// Mapping id
        id: String,
    },
}

/// Arguments for the chain command
#[derive(Parser, Debug)]
pub struct ChainArgs {
    /// Interface the composed mapping starts from
    pub source: String,

    /// Interface the composed mapping reaches
    pub target: String,

    /// Persist the composed mapping
    #[arg(long)]
    pub save: bool,

    #[command(flatten)]
    pub stores: StoreArgs,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Mapping file (JSON or YAML)
    #[arg(value_name = "MAPPING")]
    pub mapping: PathBuf,

    /// Type trees by interface id (JSON or YAML)
    #[arg(short, long)]
    pub schemas: PathBuf,
}

/// Arguments for the execute command
#[derive(Parser, Debug)]
pub struct ExecuteArgs {
    /// Mapping file (JSON or YAML)
    #[arg(value_name = "MAPPING")]
    pub mapping: PathBuf,

    /// Input payload (JSON or YAML)
    #[arg(value_name = "PAYLOAD")]
    pub payload: PathBuf,

    /// Which tree of a request/response mapping to run
    #[arg(short, long, value_enum, default_value = "request")]
    pub part: PartArg,

    /// Target interface of a message mapping (every target when omitted)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Topic parameter as NAME=VALUE (message mappings)
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a configuration file with default values
    Init(ConfigInitArgs),

    /// Show the effective configuration
    Show(ConfigShowArgs),
}

/// Arguments for config init
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Write the user config instead of the project config (.transmap.toml)
    #[arg(long)]
    pub user: bool,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "toml")]
    pub format: ConfigFormat,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Mapping direction as a command-line value
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Keyed by the leaf being produced
    Input,
    /// Keyed by the leaf being read
    Output,
}

/// Part of an interface a command works on
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PartArg {
    Request,
    Response,
    Message,
}

/// Mapping type as a command-line value
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MappingTypeArg {
    Auto,
    Manual,
    Transformation,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl From<DirectionArg> for MappingDirection {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Input => MappingDirection::Input,
            DirectionArg::Output => MappingDirection::Output,
        }
    }
}

impl From<MappingTypeArg> for MappingType {
    fn from(kind: MappingTypeArg) -> Self {
        match kind {
            MappingTypeArg::Auto => MappingType::Auto,
            MappingTypeArg::Manual => MappingType::Manual,
            MappingTypeArg::Transformation => MappingType::Transformation,
        }
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_suggest_accepts_several_providers() {
        let cli = Cli::parse_from([
            "transmap",
            "suggest",
            "lamp_set",
            "hub_a",
            "hub_b",
            "--schemas",
            "schemas.json",
            "--part",
            "message",
            "--per-provider",
        ]);
        match cli.command {
            Commands::Suggest(args) => {
                assert_eq!(args.provided, vec!["hub_a".to_string(), "hub_b".to_string()]);
                assert_eq!(args.part, PartArg::Message);
                assert!(args.per_provider);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["transmap", "suggest", "lamp_set", "-s", "s.json"]).is_err());
    }

    #[test]
    fn test_verbosity_level() {
        let cli = Cli::parse_from(["transmap", "-vv", "tree", "schema.json"]);
        assert_eq!(cli.verbosity_level(), 2);

        let cli = Cli::parse_from(["transmap", "--quiet", "tree", "schema.json"]);
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn test_execute_params_parse() {
        let cli = Cli::parse_from([
            "transmap",
            "execute",
            "mapping.json",
            "payload.json",
            "--param",
            "deviceId=lamp-7",
            "--param",
            "floor=3",
        ]);
        match cli.command {
            Commands::Execute(args) => {
                assert_eq!(
                    args.params,
                    vec![
                        ("deviceId".to_string(), "lamp-7".to_string()),
                        ("floor".to_string(), "3".to_string()),
                    ]
                );
                assert_eq!(args.part, PartArg::Request);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_param_is_rejected() {
        assert!(parse_key_value("=x").is_err());
        assert!(parse_key_value("novalue").is_err());
        assert_eq!(
            parse_key_value("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
    }

    #[test]
    fn test_graph_store_override_after_action() {
        let cli = Cli::parse_from([
            "transmap",
            "graph",
            "path",
            "a.x",
            "b.y",
            "--graph",
            "/tmp/graph.json",
        ]);
        match cli.command {
            Commands::Graph(args) => {
                assert_eq!(args.stores.graph, Some(PathBuf::from("/tmp/graph.json")));
                assert!(matches!(args.action, GraphAction::Path { .. }));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
