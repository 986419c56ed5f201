use crate::config::{CommandsConfig, ExportConfig};

pub trait WorkerGlobal:
	binary_helper::global::GlobalCtx
	+ binary_helper::global::GlobalConfigProvider<CommandsConfig>
	+ binary_helper::global::GlobalConfigProvider<ExportConfig>
	+ binary_helper::global::GlobalNats
	+ binary_helper::global::GlobalDb
	+ binary_helper::global::GlobalConfig
	+ Send
	+ Sync
	+ 'static
{
}

impl<T> WorkerGlobal for T where
	T: binary_helper::global::GlobalCtx
		+ binary_helper::global::GlobalConfigProvider<CommandsConfig>
		+ binary_helper::global::GlobalConfigProvider<ExportConfig>
		+ binary_helper::global::GlobalNats
		+ binary_helper::global::GlobalDb
		+ binary_helper::global::GlobalConfig
		+ Send
		+ Sync
		+ 'static
{
}
