//! Hosted git repositories (GitHub, GitLab) for new projects.
//!
//! Only the narrow surface project creation needs: create a repository named
//! after the project and remember its SSH clone URL, check whether one
//! exists, and delete it again.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::ScmConfig;
use crate::error::{Error, Result};
use crate::project::Project;

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("dirt/", env!("CARGO_PKG_VERSION"));

pub trait RepositoryHost {
    /// Creates the project's repository and stores its clone URL on the
    /// project.
    fn create(&self, project: &mut Project) -> Result<()>;

    fn delete(&self, project: &Project) -> Result<()>;

    fn exists(&self, project: &Project) -> Result<bool>;
}

/// The host configured under `scm`.
pub fn from_config(scm: &ScmConfig) -> Box<dyn RepositoryHost> {
    match scm {
        ScmConfig::Github {
            username,
            password,
            organization,
        } => Box::new(GitHub {
            client: Client::new(),
            username: username.clone(),
            password: password.clone(),
            organization: organization.clone(),
        }),
        ScmConfig::Gitlab {
            domain,
            private_token,
            group_id,
        } => Box::new(GitLab {
            client: Client::new(),
            api: gitlab_api(domain),
            private_token: private_token.clone(),
            group_id: *group_id,
        }),
    }
}

/// Reads the body of a failed response into a [`Error::Repository`].
fn check(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(Error::Repository(format!(
        "{action} failed: HTTP {status} {}",
        api_message(&body)
    )))
}

/// Pulls the `message` out of an API error body when there is one.
fn api_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| match value.get("message") {
            Some(Value::String(message)) => Some(message.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn project_description(project: &Project) -> String {
    project.description.clone().unwrap_or_default()
}

pub struct GitHub {
    client: Client,
    username: String,
    password: String,
    organization: Option<String>,
}

#[derive(Deserialize)]
struct GitHubRepository {
    ssh_url: String,
}

impl GitHub {
    fn owner(&self) -> &str {
        self.organization.as_deref().unwrap_or(&self.username)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
    }
}

/// Endpoint that creates a repository for `organization` or the user.
fn github_create_url(organization: Option<&str>) -> String {
    match organization {
        Some(organization) => format!("{GITHUB_API}/orgs/{organization}/repos"),
        None => format!("{GITHUB_API}/user/repos"),
    }
}

fn github_repository_url(owner: &str, name: &str) -> String {
    format!("{GITHUB_API}/repos/{owner}/{name}")
}

fn github_create_payload(project: &Project, homepage: &str) -> Value {
    json!({
        "name": project.name,
        "description": project_description(project),
        "homepage": homepage,
        "private": true,
    })
}

impl RepositoryHost for GitHub {
    fn create(&self, project: &mut Project) -> Result<()> {
        let url = github_create_url(self.organization.as_deref());
        let homepage = project.urls.staging.clone();
        debug!("POST {url}");
        let response = self
            .request(self.client.post(&url))
            .json(&github_create_payload(project, &format!("http://{homepage}")))
            .send()?;
        let repository: GitHubRepository = check(response, "creating repository")?.json()?;
        info!("created github repository {}", repository.ssh_url);
        project.set_repository_url(repository.ssh_url);
        Ok(())
    }

    fn delete(&self, project: &Project) -> Result<()> {
        let url = github_repository_url(self.owner(), &project.name);
        debug!("DELETE {url}");
        let response = self.request(self.client.delete(&url)).send()?;
        check(response, "deleting repository")?;
        Ok(())
    }

    fn exists(&self, project: &Project) -> Result<bool> {
        let url = github_repository_url(self.owner(), &project.name);
        let response = self.request(self.client.get(&url)).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response, "looking up repository")?;
        Ok(true)
    }
}

pub struct GitLab {
    client: Client,
    api: String,
    private_token: String,
    group_id: Option<u64>,
}

#[derive(Deserialize)]
struct GitLabProject {
    id: u64,
    path: String,
    ssh_url_to_repo: String,
}

/// API root for a GitLab instance; `domain` may or may not carry a scheme.
fn gitlab_api(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        format!("{domain}/api/v4")
    } else {
        format!("https://{domain}/api/v4")
    }
}

fn gitlab_create_payload(project: &Project, group_id: Option<u64>) -> Value {
    let mut payload = json!({
        "name": project.name,
        "path": project.name.to_lowercase(),
        "description": project_description(project),
    });
    if let Some(group_id) = group_id {
        payload["namespace_id"] = json!(group_id);
    }
    payload
}

impl GitLab {
    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("PRIVATE-TOKEN", &self.private_token)
            .header("User-Agent", USER_AGENT)
    }

    /// The project this account owns (or its group holds) with the
    /// project's path.
    fn find(&self, project: &Project) -> Result<Option<GitLabProject>> {
        let url = match self.group_id {
            Some(group_id) => format!("{}/groups/{group_id}/projects", self.api),
            None => format!("{}/projects", self.api),
        };
        let path = project.name.to_lowercase();
        let mut request = self
            .request(self.client.get(&url))
            .query(&[("search", project.name.as_str())]);
        if self.group_id.is_none() {
            request = request.query(&[("owned", "true")]);
        }
        let response = check(request.send()?, "looking up repository")?;
        let candidates: Vec<GitLabProject> = response.json()?;
        Ok(candidates.into_iter().find(|candidate| candidate.path == path))
    }
}

impl RepositoryHost for GitLab {
    fn create(&self, project: &mut Project) -> Result<()> {
        let url = format!("{}/projects", self.api);
        debug!("POST {url}");
        let response = self
            .request(self.client.post(&url))
            .json(&gitlab_create_payload(project, self.group_id))
            .send()?;
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(Error::Repository(format!(
                "a project named {} already exists: {}",
                project.name,
                api_message(&response.text().unwrap_or_default())
            )));
        }
        let created: GitLabProject = check(response, "creating repository")?.json()?;
        info!("created gitlab project {} ({})", created.id, created.ssh_url_to_repo);
        project.set_repository_url(created.ssh_url_to_repo);
        Ok(())
    }

    fn delete(&self, project: &Project) -> Result<()> {
        let Some(found) = self.find(project)? else {
            return Err(Error::Repository(format!(
                "no project named {} to delete",
                project.name
            )));
        };
        let url = format!("{}/projects/{}", self.api, found.id);
        debug!("DELETE {url}");
        check(self.request(self.client.delete(&url)).send()?, "deleting repository")?;
        Ok(())
    }

    fn exists(&self, project: &Project) -> Result<bool> {
        Ok(self.find(project)?.is_some())
    }
}
