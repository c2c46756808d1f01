//! GitHub REST access used by LogLens to snapshot a repository's sources.

pub mod github_api_client;
pub mod github_repo_ref;

pub use github_api_client::{
    GithubApiClient, GithubFileContent, GithubTree, GithubTreeEntry, DEFAULT_GITHUB_API_BASE,
};
pub use github_repo_ref::RepoRef;
