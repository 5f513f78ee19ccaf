use std::{
    io::{self, IsTerminal, Write},
    sync::Arc,
};

use anyhow::{Context, Result};
use barb::{
    Config, GitHub, ItemRef, ItemState, NewPullRequest, Repo, compose,
    cli::{Cli, Command, CreateArgs, IssueCommand, PrCommand, WatchArgs, resolve_repo},
    git, issues, pulls, run_interactive, watch_pull_requests,
};
use tracing::debug;

use crate::display::Painter;

struct App {
    forge: Arc<GitHub>,
    config: Config,
    painter: Painter,
    repo: Option<Repo>,
}

/// Runs one parsed command against GitHub.
pub async fn run(cli: Cli) -> Result<()> {
    let app = App {
        forge: Arc::new(GitHub::from_env()?),
        config: Config::from_env()?,
        painter: Painter::detect(),
        repo: cli.repo,
    };

    match cli.command {
        Command::Issue(command) => app.issue(command).await,
        Command::Pr(command) => app.pr(command).await,
    }
}

impl App {
    fn repo_for(&self, item: Option<&ItemRef>) -> Result<Repo> {
        resolve_repo(item.and_then(|item| item.repo.as_ref()), self.repo.as_ref())
    }

    async fn issue(&self, command: IssueCommand) -> Result<()> {
        let forge = self.forge.as_ref();
        match command {
            IssueCommand::List(args) => {
                let repo = self.repo_for(None)?;
                let issues = issues::list(forge, &repo, &args.filter(), args.max_pages).await?;
                self.painter.issue_list(&mut io::stdout().lock(), &issues)
            }
            IssueCommand::Get(args) => {
                let repo = self.repo_for(Some(&args.item))?;
                let thread = issues::thread(forge, &repo, args.item.number).await?;
                self.show(|out| self.painter.issue_thread(out, &thread)).await
            }
            IssueCommand::Reply(args) => {
                let repo = self.repo_for(Some(&args.item))?;
                let body = self.edit(String::new()).await?;
                issues::reply(forge, &repo, args.item.number, &body).await?;
                println!("Comment on #{} posted!", args.item.number);
                Ok(())
            }
            IssueCommand::Close(args) => self.set_issue_state(&args.item, ItemState::Closed).await,
            IssueCommand::Reopen(args) => self.set_issue_state(&args.item, ItemState::Open).await,
        }
    }

    async fn set_issue_state(&self, item: &ItemRef, state: ItemState) -> Result<()> {
        let repo = self.repo_for(Some(item))?;
        issues::set_state(self.forge.as_ref(), &repo, item.number, state).await?;
        let verb = match state {
            ItemState::Open => "reopened",
            ItemState::Closed => "closed",
        };
        println!("Issue {} {}!", item.number, verb);
        Ok(())
    }

    async fn pr(&self, command: PrCommand) -> Result<()> {
        let forge = self.forge.as_ref();
        match command {
            PrCommand::List(args) => {
                let repo = self.repo_for(None)?;
                let summaries = pulls::list(forge, &repo, &args.filter(), args.max_pages).await?;
                self.painter.pr_list(&mut io::stdout().lock(), &summaries)
            }
            PrCommand::Get(args) => {
                let repo = self.repo_for(Some(&args.item))?;
                let thread = pulls::thread(forge, &repo, args.item.number).await?;
                self.show(|out| self.painter.pr_thread(out, &thread)).await
            }
            PrCommand::Reply(args) => {
                let repo = self.repo_for(Some(&args.item))?;
                let body = self.edit(String::new()).await?;
                pulls::reply(forge, &repo, args.item.number, &body).await?;
                println!("Comment on #{} posted!", args.item.number);
                Ok(())
            }
            PrCommand::Create(args) => self.create_pr(args).await,
            PrCommand::Merge(args) => {
                let repo = self.repo_for(Some(&args.item))?;
                pulls::merge(forge, &repo, args.item.number).await?;
                println!("PR #{} successfully merged!", args.item.number);
                Ok(())
            }
            PrCommand::Close(args) => {
                let repo = self.repo_for(Some(&args.item))?;
                pulls::close(forge, &repo, args.item.number).await?;
                println!("Pull request {} closed!", args.item.number);
                Ok(())
            }
            PrCommand::Diff(args) => {
                let repo = self.repo_for(Some(&args.item))?;
                let files = pulls::diff(forge, &repo, args.item.number).await?;
                self.show(|out| self.painter.diff(out, &files)).await
            }
            PrCommand::Watch(args) => self.watch(args).await,
        }
    }

    async fn create_pr(&self, args: CreateArgs) -> Result<()> {
        let repo = self.repo_for(None)?;
        let message = git::last_commit_message().context("Failed to read the last commit")?;
        let title = args.title.unwrap_or(message.title);

        let body = self.edit(message.body).await?;
        let new = NewPullRequest {
            title,
            body,
            head: args.head,
            base: args.base,
        };
        let pr = pulls::create(self.forge.as_ref(), &repo, &new).await?;
        println!("PR {} created!", pr.number);
        Ok(())
    }

    async fn watch(&self, args: WatchArgs) -> Result<()> {
        let (repo, numbers) = args.target(self.repo.as_ref())?;
        let options = args.options();
        debug!(?options, "starting watch");

        let mut remaining = numbers.len();
        let mut stdout = io::stdout();
        let mut report = Ok(());
        watch_pull_requests(
            Arc::clone(&self.forge),
            &repo,
            &numbers,
            &options,
            |completion| {
                remaining = remaining.saturating_sub(1);
                if report.is_ok() {
                    report = self.painter.completion(&mut stdout, completion, remaining);
                }
            },
        )
        .await?;
        report
    }

    /// Lets the user write a text in their editor, starting from `seed`.
    async fn edit(&self, seed: String) -> Result<String> {
        let editor = self.config.editor.clone();
        tokio::task::spawn_blocking(move || {
            compose::compose(&seed, |path| {
                run_interactive(&editor.program, &editor.args_with(path))?;
                Ok(())
            })
        })
        .await
        .context("Editor task panicked")?
    }

    /// Renders output and shows it in the pager, or prints it directly when
    /// stdout is not a terminal.
    async fn show<R>(&self, render: R) -> Result<()>
    where
        R: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut content = Vec::new();
        render(&mut content)?;

        if !io::stdout().is_terminal() {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
            return Ok(());
        }

        let pager = self.config.pager.clone();
        tokio::task::spawn_blocking(move || {
            compose::page(&content, |path| {
                run_interactive(&pager.program, &pager.args_with(path))?;
                Ok(())
            })
        })
        .await
        .context("Pager task panicked")?
    }
}
