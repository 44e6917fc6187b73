use anyhow::Error;

use vkasync::vkasync_opts::VkasyncOpts;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    VkasyncOpts::process_args().await
}
