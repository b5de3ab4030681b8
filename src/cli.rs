//! Interactive front end.
//!
//! Each slash command drives the state manager and the navigator the same
//! way a page action would, and prints the outcome as a one-line notice.

use crate::model::{Post, RANKS};
use crate::navigation::{Navigator, View};
use crate::portal::Portal;
use crate::store::Store;
use anyhow::{bail, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Portal - accounts, discussion board and admin dashboard
#[derive(Parser, Debug)]
#[command(name = "portal", about = "Company portal: accounts, board and admin dashboard")]
pub struct Args {
    #[arg(long, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Directory holding the JSON blobs")]
    pub data_dir: Option<PathBuf>,

    #[arg(short = 'c', long = "command", help = "Run one command and exit")]
    pub command: Option<String>,

    #[arg(long, help = "Keep all state in memory; nothing is written to disk")]
    pub ephemeral: bool,
}

/// Get the path to the history file
fn history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".portal")
        .join("history")
}

pub struct Context<S: Store> {
    pub portal: Portal<S>,
    pub nav: Navigator,
}

impl<S: Store> Context<S> {
    pub fn new(portal: Portal<S>) -> Self {
        Self {
            portal,
            nav: Navigator::new(),
        }
    }

    fn prompt(&self) -> String {
        match self.portal.current_user() {
            Some(user) => format!("[{}] {}> ", self.nav.current(), user.email),
            None => format!("[{}]> ", self.nav.current()),
        }
    }
}

/// What the REPL should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub fn run_once<S: Store>(ctx: &mut Context<S>, line: &str) {
    handle_line(ctx, line);
}

pub fn run_repl<S: Store>(mut ctx: Context<S>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    // Load command history
    let history_file = history_path();
    let _ = rl.load_history(&history_file);

    println!("portal - type /help for commands, /exit to quit");

    loop {
        match rl.readline(&ctx.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if handle_line(&mut ctx, line) == Flow::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    // Save command history (create parent directory if needed)
    if let Some(parent) = history_file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&history_file);

    Ok(())
}

/// Parse and run one input line, printing any error as a notice
pub fn handle_line<S: Store>(ctx: &mut Context<S>, line: &str) -> Flow {
    if !line.starts_with('/') {
        eprintln!("Commands start with '/', try /help");
        return Flow::Continue;
    }

    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Could not parse command: {}", e);
            return Flow::Continue;
        }
    };
    let Some((cmd, rest)) = words.split_first() else {
        return Flow::Continue;
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();

    // Pick up what the backend or another REPL wrote since the last command
    if let Err(e) = ctx.portal.reload() {
        eprintln!("Error: could not read stored data: {}", e);
        return Flow::Continue;
    }

    let result = match cmd.as_str() {
        "/exit" | "/quit" => return Flow::Exit,
        "/help" => {
            print_help();
            Ok(())
        }
        "/view" => {
            println!("{}", ctx.nav.current());
            Ok(())
        }
        "/go" => handle_go(ctx, &args),
        "/signup" => handle_signup(ctx, &args),
        "/login" => handle_login(ctx, &args),
        "/logout" => handle_logout(ctx),
        "/whoami" => handle_whoami(ctx),
        "/posts" => handle_posts(ctx),
        "/post" => handle_post(ctx, &args),
        "/admin" => handle_admin(ctx, &args),
        "/employee" => handle_employee(ctx, &args),
        "/ranks" => {
            for rank in RANKS {
                println!("  {}", rank);
            }
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {} (try /help)", other);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
    Flow::Continue
}

fn print_help() {
    println!("Commands:");
    println!("  /exit                         - quit");
    println!("  /help                         - show commands");
    println!("  /view                         - show the current view");
    println!("  /go <view>                    - main|login|signup|board|admin");
    println!("Account:");
    println!("  /signup <email> <password> <name>");
    println!("  /login <email> <password>");
    println!("  /logout");
    println!("  /whoami");
    println!("Board:");
    println!("  /posts                        - list posts");
    println!("  /post new \"<title>\" \"<content>\"");
    println!("  /post show <id>               - open a post (counts a view)");
    println!("  /post edit <id> \"<title>\" \"<content>\"");
    println!("  /post delete <id>");
    println!("Admin:");
    println!("  /admin [stats|users|posts|logs|employees]");
    println!("  /employee <id> \"<department>\" \"<position>\" \"<rank>\"");
    println!("  /ranks                        - list the rank ladder");
}

fn handle_go<S: Store>(ctx: &mut Context<S>, args: &[&str]) -> Result<()> {
    let [view] = args else {
        bail!("Usage: /go <main|login|signup|board|admin>");
    };
    let view: View = view.parse().map_err(anyhow::Error::msg)?;
    ctx.nav.navigate(view, ctx.portal.current_user())?;
    println!("Now on {}", view);
    Ok(())
}

fn handle_signup<S: Store>(ctx: &mut Context<S>, args: &[&str]) -> Result<()> {
    let [email, password, name @ ..] = args else {
        bail!("Usage: /signup <email> <password> <name>");
    };
    ctx.nav.navigate(View::Signup, None)?;
    let name = name.join(" ");
    ctx.portal.signup(email, password, &name)?;
    ctx.nav.after_signup();
    println!("Signup complete! Please log in.");
    Ok(())
}

fn handle_login<S: Store>(ctx: &mut Context<S>, args: &[&str]) -> Result<()> {
    let [email, password] = args else {
        bail!("Usage: /login <email> <password>");
    };
    ctx.nav.navigate(View::Login, None)?;
    let user = ctx.portal.login(email, password)?;
    ctx.nav.after_login();
    println!("Welcome, {}!", user.name);
    Ok(())
}

fn handle_logout<S: Store>(ctx: &mut Context<S>) -> Result<()> {
    match ctx.portal.logout()? {
        Some(_) => {
            ctx.nav.after_logout();
            println!("Logged out.");
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

fn handle_whoami<S: Store>(ctx: &mut Context<S>) -> Result<()> {
    match ctx.portal.current_user() {
        Some(user) => {
            let role = if user.is_admin { "admin" } else { "member" };
            println!("{} <{}> ({}, id {})", user.name, user.email, role, user.id);
            if let (Some(dept), Some(pos), Some(rank)) =
                (&user.department, &user.position, &user.rank)
            {
                println!("  {} / {} / {}", dept, pos, rank);
            }
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

fn handle_posts<S: Store>(ctx: &mut Context<S>) -> Result<()> {
    ctx.nav.navigate(View::Board, ctx.portal.current_user())?;
    let posts = ctx.portal.posts();
    println!("All posts ({})", posts.len());
    if posts.is_empty() {
        println!("  No posts yet.");
    }
    for (number, post) in posts.iter().enumerate().rev() {
        print_post_row(number + 1, post);
    }
    Ok(())
}

fn print_post_row(number: usize, post: &Post) {
    println!(
        "  {:>3}. {}  [{}]  by {}  {} views  {}",
        number,
        post.title,
        post.id,
        post.author_name,
        post.views,
        post.created_at.format("%Y-%m-%d")
    );
}

fn handle_post<S: Store>(ctx: &mut Context<S>, args: &[&str]) -> Result<()> {
    ctx.nav.navigate(View::Board, ctx.portal.current_user())?;

    match args {
        ["new", title, content] => {
            if ctx.portal.current_user().is_none() {
                bail!("Login required");
            }
            if let Some(post) = ctx.portal.create_post(title, content)? {
                println!("Post created [{}]", post.id);
            }
        }
        ["show", id] => {
            if ctx.portal.record_view(id)?.is_none() {
                bail!("No post with id {}", id);
            }
            if let Some(post) = ctx.portal.post(id) {
                println!("{}", post.title);
                println!(
                    "by {} <{}>  {}  {} views",
                    post.author_name,
                    post.author_email,
                    post.created_at.format("%Y-%m-%d %H:%M"),
                    post.views
                );
                println!();
                println!("{}", post.content);
            }
        }
        ["edit", id, title, content] => {
            ctx.portal.update_post(id, title, content)?;
            println!("Post updated.");
        }
        ["delete", id] => {
            if ctx.portal.delete_post(id)? {
                println!("Post deleted.");
            } else {
                println!("No post with id {}", id);
            }
        }
        _ => bail!("Usage: /post new|show|edit|delete ... (see /help)"),
    }
    Ok(())
}

fn handle_admin<S: Store>(ctx: &mut Context<S>, args: &[&str]) -> Result<()> {
    ctx.nav.navigate(View::Admin, ctx.portal.current_user())?;
    let portal = &ctx.portal;

    match args.first().copied().unwrap_or("stats") {
        "stats" => {
            let stats = portal.stats();
            println!("Members:       {}", stats.users);
            println!("Posts:         {}", stats.posts);
            println!("Activity logs: {}", stats.activity_logs);
        }
        "users" => {
            println!("{} registered members", portal.users().len());
            for user in portal.users() {
                let role = if user.is_admin { "admin" } else { "member" };
                println!(
                    "  {:<24} {:<16} {:<7} {}",
                    user.email,
                    user.name,
                    role,
                    user.created_at.format("%Y-%m-%d")
                );
            }
        }
        "posts" => {
            println!("{} posts", portal.posts().len());
            for (number, post) in portal.posts().iter().enumerate().rev() {
                print_post_row(number + 1, post);
            }
        }
        "logs" => {
            println!("{} activity entries", portal.activity_logs().len());
            for log in portal.recent_activity() {
                println!(
                    "  {}  {:<24} {}",
                    log.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    log.user_email,
                    log.action
                );
            }
        }
        "employees" => {
            let employees = portal.employees();
            println!("{} employees", employees.len());
            for e in employees {
                println!(
                    "  [{}] {:<16} {:<24} {:<20} {:<16} {}",
                    e.id,
                    e.name,
                    e.email,
                    or_dash(&e.department),
                    or_dash(&e.position),
                    or_dash(&e.rank)
                );
            }
        }
        other => bail!("Unknown admin section: {}", other),
    }
    Ok(())
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn handle_employee<S: Store>(ctx: &mut Context<S>, args: &[&str]) -> Result<()> {
    let [id, department, position, rank] = args else {
        bail!("Usage: /employee <id> \"<department>\" \"<position>\" \"<rank>\"");
    };
    ctx.nav.navigate(View::Admin, ctx.portal.current_user())?;
    let user = ctx
        .portal
        .update_employee_info(id, department, position, rank)?;
    println!("Employee {} updated.", user.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use crate::test_utils::{admin_seed, test_portal, ADMIN_EMAIL, ADMIN_PASSWORD};

    fn ctx() -> Context<MemoryStore> {
        Context::new(test_portal())
    }

    #[test]
    fn test_exit_and_unknown() {
        let mut ctx = ctx();
        assert_eq!(handle_line(&mut ctx, "/exit"), Flow::Exit);
        assert_eq!(handle_line(&mut ctx, "/quit"), Flow::Exit);
        assert_eq!(handle_line(&mut ctx, "/nope"), Flow::Continue);
        assert_eq!(handle_line(&mut ctx, "hello"), Flow::Continue);
        assert_eq!(handle_line(&mut ctx, "/post new \"unterminated"), Flow::Continue);
    }

    #[test]
    fn test_signup_login_flow_moves_views() {
        let mut ctx = ctx();
        handle_line(&mut ctx, "/signup a@x.com pw Jane Doe");
        assert_eq!(ctx.nav.current(), View::Login);
        assert_eq!(ctx.portal.users()[1].name, "Jane Doe");

        handle_line(&mut ctx, "/login a@x.com pw");
        assert_eq!(ctx.nav.current(), View::Main);
        assert_eq!(ctx.portal.current_user().unwrap().email, "a@x.com");

        handle_line(&mut ctx, "/logout");
        assert!(ctx.portal.current_user().is_none());
        assert_eq!(ctx.nav.current(), View::Main);
    }

    #[test]
    fn test_failed_login_stays_on_login_view() {
        let mut ctx = ctx();
        handle_line(&mut ctx, "/login a@x.com wrong");
        assert_eq!(ctx.nav.current(), View::Login);
        assert!(ctx.portal.current_user().is_none());
    }

    #[test]
    fn test_quoted_post_commands() {
        let mut ctx = ctx();
        handle_line(&mut ctx, &format!("/login {} {}", ADMIN_EMAIL, ADMIN_PASSWORD));
        handle_line(&mut ctx, "/post new \"Quarterly plan\" \"Numbers are up\"");
        assert_eq!(ctx.nav.current(), View::Board);

        let id = ctx.portal.posts()[0].id.clone();
        assert_eq!(ctx.portal.posts()[0].title, "Quarterly plan");

        handle_line(&mut ctx, &format!("/post show {}", id));
        handle_line(&mut ctx, &format!("/post show {}", id));
        assert_eq!(ctx.portal.post(&id).unwrap().views, 2);

        handle_line(&mut ctx, &format!("/post edit {} \"Q3 plan\" \"Revised\"", id));
        assert_eq!(ctx.portal.post(&id).unwrap().title, "Q3 plan");

        handle_line(&mut ctx, &format!("/post delete {}", id));
        assert!(ctx.portal.posts().is_empty());
    }

    #[test]
    fn test_anonymous_post_is_refused() {
        let mut ctx = ctx();
        handle_line(&mut ctx, "/post new title body");
        assert!(ctx.portal.posts().is_empty());
    }

    #[test]
    fn test_admin_commands_are_gated() {
        let mut ctx = ctx();
        handle_line(&mut ctx, "/posts");
        handle_line(&mut ctx, "/admin users");
        assert_eq!(ctx.nav.current(), View::Board);

        handle_line(&mut ctx, &format!("/login {} {}", ADMIN_EMAIL, ADMIN_PASSWORD));
        handle_line(&mut ctx, "/admin logs");
        assert_eq!(ctx.nav.current(), View::Admin);
    }

    #[test]
    fn test_employee_update() {
        let mut ctx = ctx();
        handle_line(&mut ctx, &format!("/login {} {}", ADMIN_EMAIL, ADMIN_PASSWORD));
        handle_line(&mut ctx, "/employee 1 \"Sales\" \"Team Lead\" \"General Manager\"");
        let admin = ctx.portal.current_user().unwrap();
        assert_eq!(admin.department.as_deref(), Some("Sales"));
        assert_eq!(admin.rank.as_deref(), Some("General Manager"));
    }

    #[test]
    fn test_commands_see_accounts_created_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = Context::new(
            Portal::load(JsonFileStore::open(dir.path()).unwrap(), &admin_seed()).unwrap(),
        );
        let mut backend =
            Portal::load(JsonFileStore::open(dir.path()).unwrap(), &admin_seed()).unwrap();
        backend.signup("http@x.com", "pw", "Http").unwrap();

        handle_line(&mut ctx, "/login http@x.com pw");
        assert_eq!(ctx.portal.current_user().unwrap().email, "http@x.com");
        assert_eq!(ctx.portal.users().len(), 2);
    }

    #[test]
    fn test_go_command() {
        let mut ctx = ctx();
        handle_line(&mut ctx, "/go board");
        assert_eq!(ctx.nav.current(), View::Board);
        handle_line(&mut ctx, "/go admin");
        assert_eq!(ctx.nav.current(), View::Board);
        handle_line(&mut ctx, "/go nowhere");
        assert_eq!(ctx.nav.current(), View::Board);
    }
}
