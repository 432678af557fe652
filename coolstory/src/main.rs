mod verbose;

use clap::{FromArgMatches as _, IntoApp as _, Parser, Subcommand};
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};
use twelf::Layer;

use coolstory_common::{models::Story, Conf, Report};
use coolstory_content::PAGE_SIZE;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(flatten)]
    verbose: verbose::Verbosity,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web site
    Serve,
    /// List communities from the configured backend
    Groups,
    /// List stories from the configured backend
    Stories {
        /// Only stories shared in this community
        #[clap(long)]
        group: Option<String>,
        /// The N most liked stories instead of the newest
        #[clap(long, value_name = "N")]
        top: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    coolstory_common::install()?;

    let matches = Cli::command().args(&Conf::clap_args()).get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let conf = Conf::with_layers(&[
        Layer::Json("coolstory.json".into()),
        Layer::Toml("coolstory.toml".into()),
        Layer::Env(Some("COOLSTORY_".to_string())),
        Layer::Clap(matches),
    ])?;

    let subscriber = Registry::default()
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::Layer::default())
        .with(EnvFilter::from_default_env().add_directive(cli.verbose.log_level_filter().into()));

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve => coolstory_command_serve::run(&conf).await?,
        Commands::Groups => {
            let content = coolstory_content::init_content_source(&conf)?;

            for group in content.groups().await? {
                println!(
                    "{} {:<28} {:>6} members {:>5} stories  /groups/{}",
                    group.icon(),
                    group.name,
                    group.member_count,
                    group.story_count,
                    group.slug
                );
            }
        }
        Commands::Stories { group, top } => {
            let content = coolstory_content::init_content_source(&conf)?;

            let stories = match (group.as_deref(), top) {
                (Some(slug), top) => {
                    let stories = content.stories_by_group(slug, PAGE_SIZE).await?;

                    match top {
                        Some(n) => coolstory_content::most_liked(stories, n),
                        None => stories,
                    }
                }
                (None, Some(n)) => content.top_stories(n).await?,
                (None, None) => content.recent_stories(PAGE_SIZE).await?,
            };

            for story in &stories {
                print_story(story);
            }
        }
    }

    Ok(())
}

fn print_story(story: &Story) {
    println!(
        "{:>4}  {}  {:<48}  {} · {} · {} min · ♥ {}",
        story.id,
        story.published_on(),
        story.title,
        story.author_name(),
        story.group_name,
        story.read_minutes(),
        story.likes_count
    );
}
