use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt };

use super::{ ChatTransport, ChatWidget };

const EXIT_COMMAND: &str = "/exit";

/// Line-oriented rendition of the floating widget: one line in, one reply out,
/// until `/exit` or end of input. Before the first exchange a bare number picks
/// one of the listed starters.
pub async fn run<R, W, T>(reader: R, mut writer: W, transport: &T) -> std::io::Result<ChatWidget>
    where R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin, T: ChatTransport + ?Sized
{
    let mut widget = ChatWidget::new();
    if let Some(greeting) = widget.messages().first() {
        writer.write_all(format!("assistant> {}\n", greeting.content).as_bytes()).await?;
    }
    for (i, starter) in widget.starters().iter().enumerate() {
        writer.write_all(format!("  [{}] {}\n", i + 1, starter).as_bytes()).await?;
    }
    writer.write_all(b"you> ").await?;
    writer.flush().await?;

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == EXIT_COMMAND {
            break;
        }
        match widget.starter(&line) {
            Some(starter) => widget.set_input(starter),
            None => widget.set_input(line),
        }
        if let Some(reply) = widget.submit(transport).await {
            writer.write_all(format!("assistant> {}\n", reply.content).as_bytes()).await?;
        }
        writer.write_all(b"you> ").await?;
        writer.flush().await?;
    }
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(widget)
}
