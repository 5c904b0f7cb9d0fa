use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tgk_app::prelude::*;
use tgk_event::Dispatcher;
use tgk_flags::UploadFailure;
use tgk_models::{MatchId, TeamId};
use tgk_storage::ReadableStorage;

fn cli() -> Command {
    let kind = Arg::new("kind")
        .required(true)
        .value_parser(["team", "match", "muted"])
        .help("team, match, or muted (a match excluded from notifications)");
    let id = Arg::new("id")
        .required(true)
        .value_parser(value_parser!(i64))
        .help("Numeric team or match id");

    Command::new("tgk")
        .version(tgk_app::VERSION)
        .about("Favorites and upload consistency for the tournament kit")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Place data, cache and outbox directories under this directory"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("favorite")
                .about("Change or list favorites")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("Flag a team or match")
                        .arg(kind.clone())
                        .arg(id.clone()),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Unflag a team or match")
                        .arg(kind)
                        .arg(id),
                )
                .subcommand(Command::new("list").about("Print every flagged id")),
        )
        .subcommand(Command::new("check").about("Run the launch consistency checks and upload what diverged"))
        .subcommand(
            Command::new("matches")
                .about("List matches from the API mirror")
                .arg(
                    Arg::new("favorites")
                        .long("favorites")
                        .action(ArgAction::SetTrue)
                        .help("Only matches involving a favorite"),
                ),
        )
        .subcommand(Command::new("config").about("Print the effective configuration"))
}

fn load_config(args: &ArgMatches) -> anyhow::Result<KitConfig> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => KitConfig::load(path)?,
        None => KitConfig::default(),
    };
    Ok(match args.get_one::<PathBuf>("root") {
        Some(root) => config.rooted_at(root),
        None => config,
    })
}

fn print_ids(label: &str, mut ids: Vec<i64>) {
    ids.sort_unstable();
    let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
    println!("{label:<8} {}", rendered.join(", "));
}

async fn favorite(kit: &Kit, args: &ArgMatches) -> anyhow::Result<()> {
    match args.subcommand() {
        Some(("list", _)) => {
            let teams = kit.favorite_teams().registry().all();
            let matches = kit.favorite_matches().registry().all();
            let muted = kit.unsubscribed_matches().all();
            print_ids("teams", teams.as_set().iter().map(|id| id.raw()).collect());
            print_ids("matches", matches.as_set().iter().map(|id| id.raw()).collect());
            print_ids("muted", muted.as_set().iter().map(|id| id.raw()).collect());
        }
        Some((action, args)) => {
            let is_present = action == "add";
            let kind = args.get_one::<String>("kind").context("missing kind")?;
            let id = *args.get_one::<i64>("id").context("missing id")?;
            match kind.as_str() {
                "team" => {
                    kit.favorite_teams()
                        .registry()
                        .update_presence(TeamId(id), is_present)
                        .await?;
                }
                "match" => {
                    kit.favorite_matches()
                        .registry()
                        .update_presence(MatchId(id), is_present)
                        .await?;
                }
                _ => {
                    kit.unsubscribed_matches()
                        .update_presence(MatchId(id), is_present)
                        .await?;
                }
            }
            println!("{action} {kind} {id}");
        }
        None => {}
    }
    Ok(())
}

async fn check(kit: &Kit) -> usize {
    let failures = Arc::new(AtomicUsize::new(0));
    let teams_failed = Arc::clone(&failures);
    let matches_failed = Arc::clone(&failures);
    let watching = kit
        .favorite_teams()
        .uploader()
        .did_fail()
        .subscribe(move |failure: &UploadFailure<TeamId>| {
            eprintln!("favorite teams not uploaded: {}", failure.reason);
            teams_failed.fetch_add(1, Ordering::Relaxed);
        })
        .and(
            kit.favorite_matches()
                .uploader()
                .did_fail()
                .subscribe(move |failure: &UploadFailure<MatchId>| {
                    eprintln!("favorite matches not uploaded: {}", failure.reason);
                    matches_failed.fetch_add(1, Ordering::Relaxed);
                }),
        );

    kit.launch();
    kit.settle().await;
    watching.cancel();
    failures.load(Ordering::Relaxed)
}

async fn list_matches(kit: &Kit, favorites_only: bool) -> anyhow::Result<()> {
    let all = kit
        .matches_api()
        .all
        .retrieve(())
        .await
        .context("cannot read matches, is api_mirror_dir set?")?;
    println!("edition {}", all.edition);
    for game in &all.content.matches {
        let favorite = kit.is_favorite(game);
        if favorites_only && !favorite {
            continue;
        }
        let marker = if kit.should_notify(game) {
            '*'
        } else if favorite {
            '~'
        } else {
            ' '
        };
        println!(
            "{marker} {:>4}  {}  {} {} {}",
            game.id,
            game.date.format("%Y-%m-%d %H:%M"),
            game.home.short_name,
            game.score_string(),
            game.away.short_name,
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli().get_matches();
    let config = load_config(&args)?;
    tgk_app::logging::init(&config.log_filter, config.log_format);

    if let Some(("config", _)) = args.subcommand() {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let kit = Kit::new(config, Dispatcher::current()?)?;
    kit.load().await.context("cannot load favorites")?;
    let _wiring = kit.start();

    match args.subcommand() {
        Some(("favorite", args)) => favorite(&kit, args).await?,
        Some(("check", _)) => {
            let failed = check(&kit).await;
            if failed > 0 {
                anyhow::bail!("{failed} upload(s) failed, they will be retried on the next check");
            }
            println!("uploads consistent");
        }
        Some(("matches", args)) => list_matches(&kit, args.get_flag("favorites")).await?,
        _ => {}
    }

    kit.settle().await;
    Ok(())
}
