/// A line on the broadcast channel, dispatched on its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message<'a> {
    Quit,
    /// authoritative position; the token is only interpreted by `Position`
    Position(&'a str),
    Unknown(&'a str),
}

impl<'a> Message<'a> {
    pub fn parse(line: &'a str) -> Self {
        if line.starts_with("quit") {
            Message::Quit
        } else if let Some(token) = line.strip_prefix("pos ") {
            Message::Position(token)
        } else {
            Message::Unknown(line)
        }
    }

}

// the two lines we ever send ourselves, newline-terminated
impl Message<'_> {
    pub fn quit_line() -> String {
        "quit\n".to_owned()
    }

    pub fn position_line(token: &str) -> String {
        format!("pos {}\n", token)
    }
}

/*====================================================================================================================*/
