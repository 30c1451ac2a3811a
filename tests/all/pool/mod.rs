mod concurrency;
mod shutdown;
