use crate::SessionArgs;

use super::Session;

pub async fn run(args: &SessionArgs, text: &str) -> Result<(), String> {
    let mut session = Session::open(args)?;
    let text = pt_dicecore::command::strip_command_prefix(text).unwrap_or(text);
    if session.execute(text).await? {
        Ok(())
    } else {
        Err(format!("'{text}' produced no roll"))
    }
}
