use mockall::mock;
use minirank_core::dram::{DramCommand, PowerSink};

mock! {
    pub Sink {}
    impl PowerSink for Sink {
        fn do_command(&mut self, rank: u8, command: DramCommand, bank: u8, cycle: u64);
    }
}
