use std::error::Error;
use toronto_open_data::{AccessPath, QuerySpec, SortSpec, TorontoClient, format, resolver};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("Toronto Open Data Rust Client Demo");
    println!("==================================\n");

    let client = TorontoClient::new()?;

    // 1. Search for datasets
    println!("Searching for 'restaurant inspections'...");
    let results = client.search("restaurant inspections", 5).await?;
    println!("{}\n", format::format_search_results("restaurant inspections", &results));

    // 2. Resolve how each hit can be read
    for dataset in &results {
        let path = match resolver::resolve(dataset) {
            Ok(AccessPath::Datastore(resource)) => format!("datastore `{}`", resource.id),
            Ok(AccessPath::CsvDownload { url, .. }) => format!("CSV download {url}"),
            Err(err) => err.to_string(),
        };
        println!("  {} -> {}", dataset.id, path);
    }
    println!();

    // 3. Query the DineSafe datastore
    println!("Latest passing DineSafe inspections...");
    let spec = QuerySpec::new("dinesafe")
        .with_filter("Establishment Status", "Pass")
        .with_sort(SortSpec::desc("Inspection Date"))
        .with_limit(5);
    match client.query(&spec).await {
        Ok(outcome) => println!("{}\n", format::format_query_result(&outcome)),
        Err(err) => println!("{}\n", format::format_error(&err)),
    }

    // 4. Preview a CSV download, if any hit has one
    let csv_url = results.iter().find_map(|dataset| match resolver::resolve(dataset) {
        Ok(AccessPath::CsvDownload { url, .. }) => Some(url.to_string()),
        _ => None,
    });
    if let Some(url) = csv_url {
        println!("Previewing {url}...");
        let preview = client.preview_csv(&url, 5).await?;
        println!("{}", format::format_csv_preview(&preview));
    }

    println!("Demo completed. Serve these tools to an MCP client with:");
    println!("   cargo run -p toronto-mcp-server");

    Ok(())
}
