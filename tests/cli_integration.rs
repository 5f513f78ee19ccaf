use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use barb::{
    CombinedStatus, Comment, CommitRef, CommitStatus, FileDiff, Forge, Issue, ItemState,
    ListFilter, NewPullRequest, PageRequest, PullRequest, Repo, SortField, StateFilter,
    StatusState, User,
    cli::{Command, IssueCommand, PrCommand},
    issues, parse_args, pulls,
};
use chrono::Utc;

/// Everything the mock was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
enum Call {
    ListPulls(PageRequest),
    ListIssues(PageRequest),
    ListComments(u64, PageRequest),
    Status(String),
    Compare(String, String),
    Comment(u64, String),
    Create(NewPullRequest),
    Merge(u64),
    ClosePull(u64),
    IssueState(u64, ItemState),
}

/// Mock GitHub hub serving fixed pages.
#[derive(Default)]
struct MockForge {
    pulls: Vec<Vec<PullRequest>>,
    issues: Vec<Vec<Issue>>,
    comments: Vec<Vec<Comment>>,
    failing_page: Option<u32>,
    calls: Mutex<Vec<Call>>,
}

impl MockForge {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn page<T: Clone>(&self, pages: &[Vec<T>], request: &PageRequest) -> Result<Vec<T>> {
        if self.failing_page == Some(request.page) {
            anyhow::bail!("502 Bad Gateway on page {}", request.page);
        }
        Ok(pages
            .get(request.page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    fn find_pull(&self, number: u64) -> Result<PullRequest> {
        self.pulls
            .iter()
            .flatten()
            .find(|pr| pr.number == number)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("pull request #{} not found", number))
    }
}

#[async_trait]
impl Forge for MockForge {
    async fn pull_request(&self, _repo: &Repo, number: u64) -> Result<PullRequest> {
        self.find_pull(number)
    }

    async fn list_pull_requests(
        &self,
        _repo: &Repo,
        page: &PageRequest,
    ) -> Result<Vec<PullRequest>> {
        self.record(Call::ListPulls(*page));
        self.page(&self.pulls, page)
    }

    async fn create_pull_request(&self, _repo: &Repo, new: &NewPullRequest) -> Result<PullRequest> {
        self.record(Call::Create(new.clone()));
        let mut pr = pull_request(99, &new.title, "me");
        pr.body = Some(new.body.clone());
        Ok(pr)
    }

    async fn merge_pull_request(&self, _repo: &Repo, number: u64) -> Result<()> {
        self.record(Call::Merge(number));
        Ok(())
    }

    async fn close_pull_request(&self, _repo: &Repo, number: u64) -> Result<()> {
        self.record(Call::ClosePull(number));
        Ok(())
    }

    async fn compare(&self, _repo: &Repo, base: &str, head: &str) -> Result<Vec<FileDiff>> {
        self.record(Call::Compare(base.to_string(), head.to_string()));
        Ok(vec![FileDiff {
            filename: "README.md".to_string(),
            patch: Some("+hello".to_string()),
        }])
    }

    async fn combined_status(&self, _repo: &Repo, sha: &str) -> Result<CombinedStatus> {
        self.record(Call::Status(sha.to_string()));
        let state = if sha.ends_with('1') {
            StatusState::Failure
        } else {
            StatusState::Success
        };
        Ok(CombinedStatus {
            state,
            statuses: vec![CommitStatus {
                state,
                context: "ci/test".to_string(),
                target_url: None,
            }],
        })
    }

    async fn issue(&self, _repo: &Repo, number: u64) -> Result<Issue> {
        self.issues
            .iter()
            .flatten()
            .find(|issue| issue.number == number)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("issue #{} not found", number))
    }

    async fn list_issues(&self, _repo: &Repo, page: &PageRequest) -> Result<Vec<Issue>> {
        self.record(Call::ListIssues(*page));
        self.page(&self.issues, page)
    }

    async fn list_comments(
        &self,
        _repo: &Repo,
        number: u64,
        page: &PageRequest,
    ) -> Result<Vec<Comment>> {
        self.record(Call::ListComments(number, *page));
        self.page(&self.comments, page)
    }

    async fn create_comment(&self, _repo: &Repo, number: u64, body: &str) -> Result<()> {
        self.record(Call::Comment(number, body.to_string()));
        Ok(())
    }

    async fn set_issue_state(&self, _repo: &Repo, number: u64, state: ItemState) -> Result<()> {
        self.record(Call::IssueState(number, state));
        Ok(())
    }
}

fn test_repo() -> Repo {
    Repo::new("owner", "repo").unwrap()
}

fn user(login: &str) -> User {
    User {
        login: login.to_string(),
    }
}

fn pull_request(number: u64, title: &str, author: &str) -> PullRequest {
    PullRequest {
        number,
        title: title.to_string(),
        user: user(author),
        state: ItemState::Open,
        body: None,
        html_url: format!("https://github.com/owner/repo/pull/{number}"),
        updated_at: Utc::now(),
        head: CommitRef {
            branch: format!("topic-{number}"),
            sha: format!("head{number}"),
        },
        base: CommitRef {
            branch: "master".to_string(),
            sha: "base0".to_string(),
        },
    }
}

fn issue(number: u64, title: &str) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        user: user("carol"),
        state: ItemState::Open,
        body: Some(format!("Body of {number}")),
        html_url: format!("https://github.com/owner/repo/issues/{number}"),
        updated_at: Utc::now(),
    }
}

fn comment(body: &str) -> Comment {
    Comment {
        user: user("dave"),
        body: Some(body.to_string()),
        created_at: Utc::now(),
    }
}

fn mock_pulls() -> MockForge {
    MockForge {
        pulls: vec![
            vec![
                pull_request(1, "Fix build", "alice"),
                pull_request(2, "Add docs", "bob"),
            ],
            vec![pull_request(3, "Refactor parser", "alice")],
        ],
        ..Default::default()
    }
}

fn list_requests(calls: &[Call]) -> Vec<u32> {
    calls
        .iter()
        .filter_map(|call| match call {
            Call::ListPulls(request) | Call::ListIssues(request) => Some(request.page),
            Call::ListComments(_, request) => Some(request.page),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_pr_list_aggregates_pages_with_status() {
    let forge = mock_pulls();

    let summaries = pulls::list(&forge, &test_repo(), &ListFilter::default(), 5)
        .await
        .unwrap();

    let numbers: Vec<u64> = summaries.iter().map(|s| s.pr.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(summaries[0].status.state, StatusState::Failure);
    assert_eq!(summaries[1].status.state, StatusState::Success);

    let calls = forge.calls();
    // Two full pages and the empty third one.
    assert_eq!(list_requests(&calls), vec![1, 2, 3]);
    // Statuses are looked up once the list is complete, in list order.
    assert_eq!(
        &calls[3..],
        &[
            Call::Status("head1".to_string()),
            Call::Status("head2".to_string()),
            Call::Status("head3".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_pr_list_passes_filter() {
    let forge = mock_pulls();
    let filter = ListFilter {
        state: StateFilter::All,
        sort: SortField::Updated,
        ..Default::default()
    };

    pulls::list(&forge, &test_repo(), &filter, 5).await.unwrap();

    let Call::ListPulls(first) = &forge.calls()[0] else {
        panic!("expected a list call first");
    };
    assert_eq!(*first, PageRequest::new(1).filtered(&filter));
}

#[tokio::test]
async fn test_pr_list_respects_page_ceiling() {
    let forge = MockForge {
        pulls: (1..=10).map(|n| vec![pull_request(n, "PR", "alice")]).collect(),
        ..Default::default()
    };

    let summaries = pulls::list(&forge, &test_repo(), &ListFilter::default(), 3)
        .await
        .unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(list_requests(&forge.calls()), vec![1, 2]);
}

#[tokio::test]
async fn test_issue_list_error_is_fatal() {
    let forge = MockForge {
        issues: vec![vec![issue(1, "one")], vec![issue(2, "two")], vec![issue(3, "three")]],
        failing_page: Some(2),
        ..Default::default()
    };

    let err = issues::list(&forge, &test_repo(), &ListFilter::default(), 5)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("page 2"));
    assert_eq!(list_requests(&forge.calls()), vec![1, 2]);
}

#[tokio::test]
async fn test_issue_list_empty() {
    let forge = MockForge::default();

    let issues = issues::list(&forge, &test_repo(), &ListFilter::default(), 5)
        .await
        .unwrap();

    assert!(issues.is_empty());
    assert_eq!(list_requests(&forge.calls()), vec![1]);
}

#[tokio::test]
async fn test_issue_thread_collects_comments() {
    let forge = MockForge {
        issues: vec![vec![issue(7, "Crash")]],
        comments: vec![vec![comment("first"), comment("second")], vec![comment("third")]],
        ..Default::default()
    };

    let thread = issues::thread(&forge, &test_repo(), 7).await.unwrap();

    assert_eq!(thread.issue.title, "Crash");
    let bodies: Vec<_> = thread
        .comments
        .iter()
        .map(|c| c.body.as_deref().unwrap())
        .collect();
    assert_eq!(bodies, vec!["first", "second", "third"]);

    let calls = forge.calls();
    assert_eq!(
        calls[0],
        Call::ListComments(7, PageRequest::new(1).per_page(pulls::COMMENTS_PER_PAGE))
    );
    assert_eq!(list_requests(&calls), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_pr_thread() {
    let forge = MockForge {
        comments: vec![vec![comment("LGTM")]],
        ..mock_pulls()
    };

    let thread = pulls::thread(&forge, &test_repo(), 2).await.unwrap();

    assert_eq!(thread.pr.title, "Add docs");
    assert_eq!(thread.status.state, StatusState::Success);
    assert_eq!(thread.comments.len(), 1);
    assert!(forge.calls().contains(&Call::Status("head2".to_string())));
}

#[tokio::test]
async fn test_pr_thread_unknown_number() {
    let forge = mock_pulls();
    let err = pulls::thread(&forge, &test_repo(), 42).await.unwrap_err();
    assert!(err.to_string().contains("#42"));
    assert!(forge.calls().is_empty());
}

#[tokio::test]
async fn test_pr_diff_compares_base_and_head() {
    let forge = mock_pulls();

    let files = pulls::diff(&forge, &test_repo(), 3).await.unwrap();

    assert_eq!(files[0].filename, "README.md");
    assert_eq!(
        forge.calls(),
        vec![Call::Compare("base0".to_string(), "head3".to_string())]
    );
}

#[tokio::test]
async fn test_reply_posts_comment() {
    let forge = mock_pulls();

    pulls::reply(&forge, &test_repo(), 1, "Thanks!\n").await.unwrap();
    issues::reply(&forge, &test_repo(), 8, "Fixed in #1").await.unwrap();

    assert_eq!(
        forge.calls(),
        vec![
            Call::Comment(1, "Thanks!\n".to_string()),
            Call::Comment(8, "Fixed in #1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_blank_reply_is_not_posted() {
    let forge = mock_pulls();

    let err = issues::reply(&forge, &test_repo(), 1, " \n\t\n").await.unwrap_err();

    assert_eq!(err.to_string(), "no content to post");
    assert!(forge.calls().is_empty());
}

#[tokio::test]
async fn test_create_merge_close() {
    let forge = MockForge::default();
    let new = NewPullRequest {
        title: "Add widget".to_string(),
        body: "Longer description".to_string(),
        head: "widget".to_string(),
        base: "master".to_string(),
    };

    let pr = pulls::create(&forge, &test_repo(), &new).await.unwrap();
    pulls::merge(&forge, &test_repo(), pr.number).await.unwrap();
    pulls::close(&forge, &test_repo(), 5).await.unwrap();

    assert_eq!(pr.number, 99);
    assert_eq!(
        forge.calls(),
        vec![Call::Create(new), Call::Merge(99), Call::ClosePull(5)]
    );
}

#[tokio::test]
async fn test_create_requires_title() {
    let forge = MockForge::default();
    let new = NewPullRequest {
        title: "  ".to_string(),
        body: "body".to_string(),
        head: "widget".to_string(),
        base: "master".to_string(),
    };

    assert!(pulls::create(&forge, &test_repo(), &new).await.is_err());
    assert!(forge.calls().is_empty());
}

#[tokio::test]
async fn test_issue_close_and_reopen() {
    let forge = MockForge::default();

    issues::set_state(&forge, &test_repo(), 4, ItemState::Closed)
        .await
        .unwrap();
    issues::set_state(&forge, &test_repo(), 4, ItemState::Open)
        .await
        .unwrap();

    assert_eq!(
        forge.calls(),
        vec![
            Call::IssueState(4, ItemState::Closed),
            Call::IssueState(4, ItemState::Open),
        ]
    );
}

#[test]
fn test_cli_list_feeds_aggregator() {
    let cli = parse_args(["barb", "-r", "owner/repo", "pr", "list", "--max-pages", "2"]).unwrap();
    assert_eq!(cli.repo, Some(test_repo()));
    let Command::Pr(PrCommand::List(args)) = cli.command else {
        panic!("expected pr list");
    };
    assert_eq!(args.max_pages, 2);
    assert_eq!(args.filter(), ListFilter::default());
}

#[test]
fn test_cli_rejects_unknown_subcommand() {
    let err = parse_args(["barb", "issue", "delete", "1"]).unwrap_err();
    assert!(err.downcast_ref::<clap::Error>().is_some());
}

#[test]
fn test_cli_rejects_bad_item() {
    assert!(parse_args(["barb", "issue", "get", "not-a-number"]).is_err());
    assert!(parse_args(["barb", "issue", "get", "https://gitlab.com/o/r/issues/1"]).is_err());
}

#[test]
fn test_cli_issue_url() {
    let cli = parse_args(["barb", "issue", "close", "https://github.com/owner/repo/issues/12"])
        .unwrap();
    let Command::Issue(IssueCommand::Close(args)) = cli.command else {
        panic!("expected issue close");
    };
    assert_eq!(args.item.repo, Some(test_repo()));
    assert_eq!(args.item.number, 12);
}
