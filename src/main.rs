use pvzload::error::AppResult;

fn main() -> AppResult<()> {
    pvzload::run()
}
