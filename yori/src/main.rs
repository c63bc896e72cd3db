use yori::commands::command_argument_builder;
use yori::handlers::{handle_fuzz, init_logging};
use yori_core::print_banner;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();

    init_logging(matches.get_count("verbose"));

    // Show banner unless --quiet flag is set
    if !matches.get_flag("quiet") {
        print_banner();
    }

    handle_fuzz(&matches).await;
}
