use crate::domain::model::ObjectKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "twit")]
#[command(version, about = "A small Git-compatible version control tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Run as if twit was started in DIR
    #[arg(short = 'C', value_name = "DIR", global = true)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create an empty repository
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Print the payload of an object
    CatFile {
        #[arg(value_name = "TYPE")]
        kind: ObjectKind,
        object: String,
    },

    /// Compute an object id, optionally storing the object
    HashObject {
        /// Write the object into the repository
        #[arg(short)]
        write: bool,
        #[arg(short = 't', value_name = "TYPE", default_value = "blob")]
        kind: ObjectKind,
        path: PathBuf,
    },

    /// Print the commit graph reachable from COMMIT as Graphviz
    Log {
        #[arg(default_value = "HEAD")]
        commit: String,
    },

    /// List the contents of a tree
    LsTree {
        /// Recurse into subtrees
        #[arg(short)]
        recursive: bool,
        tree: String,
    },

    /// Instantiate a commit inside an empty directory
    Checkout { commit: String, path: PathBuf },

    /// List references
    ShowRef,

    /// List tags, or create one
    Tag {
        /// Create an annotated tag object
        #[arg(short)]
        annotate: bool,
        /// Annotation message
        #[arg(short, requires = "annotate")]
        message: Option<String>,
        name: Option<String>,
        #[arg(default_value = "HEAD")]
        object: String,
    },

    /// Resolve a name to an object id
    RevParse {
        /// Peel the object to this type
        #[arg(long = "twit-type", value_name = "TYPE")]
        kind: Option<ObjectKind>,
        name: String,
    },

    /// List the staged files
    LsFiles {
        /// Show every field of each index entry
        #[arg(long)]
        verbose: bool,
    },

    /// Print the paths matched by ignore rules
    CheckIgnore {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Show the working tree status
    Status,

    /// Remove files from the index and the worktree
    Rm {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Stage files
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Record the staged changes
    Commit {
        #[arg(short)]
        message: String,
    },
}
