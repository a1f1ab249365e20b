fn main() -> anyhow::Result<()> {
    astra_planner::run()
}
