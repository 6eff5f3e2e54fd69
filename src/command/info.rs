use anyhow::Result;
use cfsession::Session;

pub async fn run_info(session: &Session) -> Result<()> {
    let info = session.info();
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("API endpoint:            {}", info.api_endpoint);
    println!("API version:             {}", info.api_version);
    println!("Authorization endpoint:  {}", info.authorization_endpoint);
    println!("Token endpoint:          {}", info.token_endpoint);
    println!("Logging endpoint:        {}", or_dash(&info.loggregator_endpoint));
    println!("Doppler endpoint:        {}", or_dash(&info.doppler_endpoint));
    println!("Routing endpoint:        {}", or_dash(&info.routing_api_endpoint));
    println!("Min CLI version:         {}", or_dash(&info.min_cli_version));
    println!("SSH OAuth client:        {}", or_dash(&info.ssh_oauth_client));
    println!("User:                    {}", info.user);

    Ok(())
}
