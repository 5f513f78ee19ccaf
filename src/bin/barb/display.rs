use std::io::{IsTerminal, Write};

use anyhow::Result;
use barb::{
    CombinedStatus, Comment, Completion, FileDiff, Issue, ItemState, StatusState,
    issues::IssueThread,
    pulls::{PullRequestSummary, PullRequestThread},
};
use chrono::{DateTime, Local, Utc};
use crossterm::style::{Color, Stylize};

const DEFAULT_WIDTH: usize = 80;

/// The fields shared by issue and pull request headers.
struct Headline<'a> {
    login: &'a str,
    updated_at: DateTime<Utc>,
    title: &'a str,
    number: u64,
    url: &'a str,
    state: ItemState,
}

/// Writes formatted output, colored or plain.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
    width: usize,
}

impl Painter {
    pub fn new(color: bool, width: usize) -> Self {
        Self { color, width }
    }

    /// Colors only when stdout is a terminal; separators span its width.
    pub fn detect() -> Self {
        let width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .filter(|&w| w > 0)
            .unwrap_or(DEFAULT_WIDTH);
        Self::new(std::io::stdout().is_terminal(), width)
    }

    fn paint<W: Write>(&self, writer: &mut W, color: Color, text: &str) -> Result<()> {
        if self.color {
            write!(writer, "{}", text.with(color))?;
        } else {
            write!(writer, "{text}")?;
        }
        Ok(())
    }

    fn paint_line<W: Write>(&self, writer: &mut W, color: Color, text: &str) -> Result<()> {
        self.paint(writer, color, text)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn separator<W: Write>(&self, writer: &mut W) -> Result<()> {
        let dashes = "-".repeat(self.width);
        if self.color {
            writeln!(writer, "{}", dashes.as_str().with(Color::Yellow).bold())?;
        } else {
            writeln!(writer, "{dashes}")?;
        }
        Ok(())
    }

    fn header<W: Write>(&self, writer: &mut W, headline: &Headline<'_>) -> Result<()> {
        self.separator(writer)?;
        for line in [
            format!("From: {}", headline.login),
            format!("Last Updated: {}", format_updated(headline.updated_at)),
            format!("Title: {}", headline.title),
            format!("Number: {}", headline.number),
            format!("URL: {}", headline.url),
        ] {
            self.paint_line(writer, Color::Blue, &line)?;
        }

        let state_color = match headline.state {
            ItemState::Open => Color::Green,
            ItemState::Closed => Color::Red,
        };
        self.paint_line(writer, state_color, &format!("State: {}", headline.state))
    }

    fn hooks<W: Write>(&self, writer: &mut W, status: &CombinedStatus) -> Result<()> {
        let color = status_color(status.state);
        if status.state == StatusState::Success {
            return self.paint_line(writer, color, "Hooks State: success");
        }

        self.paint_line(writer, color, &format!("Hooks State: {}", status.state))?;
        for check in status.unsuccessful() {
            let line = format!(
                "\t{} : {}",
                check.context,
                check.target_url.as_deref().unwrap_or("")
            );
            self.paint_line(writer, color, &line)?;
        }
        Ok(())
    }

    fn body_and_comments<W: Write>(
        &self,
        writer: &mut W,
        body: Option<&str>,
        comments: &[Comment],
    ) -> Result<()> {
        self.separator(writer)?;
        writeln!(writer, "{}", body.unwrap_or_default())?;

        for comment in comments {
            writeln!(writer)?;
            self.separator(writer)?;
            self.paint_line(writer, Color::White, &format!("From: {}", comment.user.login))?;
            let date = comment.created_at.with_timezone(&Local);
            self.paint_line(
                writer,
                Color::White,
                &format!("Date: {}", date.format("%Y-%m-%d %H:%M:%S %z")),
            )?;
            self.separator(writer)?;
            writeln!(writer)?;
            writeln!(writer, "{}", comment.body.as_deref().unwrap_or_default())?;
        }

        writeln!(writer)?;
        Ok(())
    }

    pub fn issue_thread<W: Write>(&self, writer: &mut W, thread: &IssueThread) -> Result<()> {
        let issue = &thread.issue;
        let headline = Headline {
            login: &issue.user.login,
            updated_at: issue.updated_at,
            title: &issue.title,
            number: issue.number,
            url: &issue.html_url,
            state: issue.state,
        };
        self.header(writer, &headline)?;
        self.body_and_comments(writer, issue.body.as_deref(), &thread.comments)
    }

    pub fn pr_thread<W: Write>(&self, writer: &mut W, thread: &PullRequestThread) -> Result<()> {
        let pr = &thread.pr;
        let headline = Headline {
            login: &pr.user.login,
            updated_at: pr.updated_at,
            title: &pr.title,
            number: pr.number,
            url: &pr.html_url,
            state: pr.state,
        };
        self.header(writer, &headline)?;
        self.hooks(writer, &thread.status)?;
        self.body_and_comments(writer, pr.body.as_deref(), &thread.comments)
    }

    fn list_prefix<W: Write>(&self, writer: &mut W, number: u64, login: &str) -> Result<()> {
        self.paint(writer, Color::White, &format!("[ {number} ] "))?;
        self.paint(writer, Color::Blue, &format!("({login}) "))
    }

    pub fn issue_list<W: Write>(&self, writer: &mut W, issues: &[Issue]) -> Result<()> {
        for issue in issues {
            self.list_prefix(writer, issue.number, &issue.user.login)?;
            writeln!(writer, "{}", issue.title)?;
        }
        Ok(())
    }

    pub fn pr_list<W: Write>(
        &self,
        writer: &mut W,
        summaries: &[PullRequestSummary],
    ) -> Result<()> {
        for summary in summaries {
            let pr = &summary.pr;
            self.list_prefix(writer, pr.number, &pr.user.login)?;
            write!(writer, "{}", pr.title)?;
            let state = summary.status.state;
            self.paint_line(writer, status_color(state), &format!(" [ {state} ]"))?;
        }
        Ok(())
    }

    pub fn diff<W: Write>(&self, writer: &mut W, files: &[FileDiff]) -> Result<()> {
        for file in files {
            self.separator(writer)?;
            writeln!(writer, "{}", file.filename)?;
            self.separator(writer)?;

            for line in file.patch.as_deref().unwrap_or_default().lines() {
                match line.chars().next() {
                    Some('+') => self.paint_line(writer, Color::Green, line)?,
                    Some('-') => self.paint_line(writer, Color::Red, line)?,
                    Some('!') => self.paint_line(writer, Color::Yellow, line)?,
                    _ => writeln!(writer, "{line}")?,
                }
            }
        }
        Ok(())
    }

    pub fn completion<W: Write>(
        &self,
        writer: &mut W,
        completion: &Completion,
        remaining: usize,
    ) -> Result<()> {
        self.paint(writer, Color::White, "Finished: ")?;
        self.paint_line(
            writer,
            status_color(completion.state),
            &format!("{} ({})", completion.number, completion.state),
        )?;
        writeln!(writer, "Remaining: {remaining}")?;
        Ok(())
    }
}

fn status_color(state: StatusState) -> Color {
    match state {
        StatusState::Success => Color::Green,
        StatusState::Pending => Color::White,
        StatusState::Error => Color::Yellow,
        StatusState::Failure => Color::Red,
    }
}

fn format_updated(time: DateTime<Utc>) -> String {
    use chrono_humanize::HumanTime;
    format!(
        "{} ({})",
        time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %z"),
        HumanTime::from(time)
    )
}
