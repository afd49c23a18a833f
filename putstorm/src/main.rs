use anyhow::Result;

fn main() -> Result<()> {
    putstorm::cli::execute()
}
